use crate::attr::{self, Attr};
use crate::context::Context;
use crate::error::HandlerError;
use crate::handler::RecordHandler;
use crate::level::Level;
use crate::record::Record;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// A handler that keeps every record in memory.
///
/// Useful for unit tests that want to assert on what was logged without
/// parsing output. Derived handlers share the same storage.
#[derive(Clone, Default)]
pub struct MemoryHandler {
    min_level: Option<Level>,
    records: Arc<Mutex<Vec<Record>>>,
    attrs: Vec<Attr>,
    groups: Vec<String>,
}

impl MemoryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept records at or above `level`.
    pub fn with_min_level(level: Level) -> Self {
        MemoryHandler {
            min_level: Some(level),
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the captured records, pre-attached attributes first.
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn last_message(&self) -> Option<String> {
        self.lock().last().map(|r| r.message.clone())
    }

    fn scoped(&self, attrs: Vec<Attr>) -> Vec<Attr> {
        self.groups
            .iter()
            .rev()
            .fold(attrs, |inner, group| vec![attr::group(group.clone(), inner)])
    }
}

impl RecordHandler for MemoryHandler {
    fn enabled(&self, level: Level) -> bool {
        self.min_level.map_or(true, |min| level >= min)
    }

    fn handle(&self, _ctx: &Context, mut record: Record) -> Result<(), HandlerError> {
        let own = std::mem::take(&mut record.attrs);
        let mut attrs = self.attrs.clone();
        if !own.is_empty() {
            attrs.extend(self.scoped(own));
        }
        record.attrs = attrs;
        self.lock().push(record);
        Ok(())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn RecordHandler> {
        let mut handler = self.clone();
        handler.attrs.extend(self.scoped(attrs));
        Arc::new(handler)
    }

    fn with_group(&self, name: &str) -> Arc<dyn RecordHandler> {
        let mut handler = self.clone();
        if !name.is_empty() {
            handler.groups.push(name.to_string());
        }
        Arc::new(handler)
    }
}

/// Cloneable in-memory byte sink implementing [`Write`].
///
/// Hand one clone to a [`JsonHandler`](crate::json::JsonHandler) or
/// [`LoggerConfig`](crate::logger::LoggerConfig) and read the output through
/// another.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|p| p.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Every non-empty line parsed as JSON. Lines that fail to parse are
    /// returned as JSON strings.
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.contents()
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                serde_json::from_str(l)
                    .unwrap_or_else(|_| serde_json::Value::String(l.to_string()))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().map(|b| b.is_empty()).unwrap_or(true)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer lock poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
