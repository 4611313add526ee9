use crate::attr::{self, Attr, AttrValue};
use crate::context::Context;
use crate::error::HandlerError;
use crate::handler::RecordHandler;
use crate::level::Level;
use crate::record::Record;
use crate::schema::{LEVEL_KEY, MESSAGE_KEY, SOURCE_KEY, TIME_KEY};
use chrono::SecondsFormat;
use serde_json::{Map, Value};
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Rewrites one of the built-in attributes (`time`, `level`, `msg`,
/// `source`) before it is written.
pub type ReplaceAttr = Arc<dyn Fn(Attr) -> Attr + Send + Sync>;

/// Options for [`JsonHandler`].
///
/// **Fields**
/// - `min_level`: records below this level are reported as disabled.
/// - `add_source`: write the call site under the `source` key.
/// - `replace_attr`: optional rewrite applied to the built-in keys.
#[derive(Clone, Default)]
pub struct HandlerOptions {
    pub min_level: Level,
    pub add_source: bool,
    pub replace_attr: Option<ReplaceAttr>,
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Handler writing one JSON object per line to a byte stream.
///
/// Every record is written and flushed under a lock, so concurrent loggers
/// never interleave partial lines.
#[derive(Clone)]
pub struct JsonHandler {
    writer: SharedWriter,
    options: Arc<HandlerOptions>,
    preformatted: Map<String, Value>,
    groups: Vec<String>,
}

impl JsonHandler {
    pub fn new(writer: impl Write + Send + 'static, options: HandlerOptions) -> Self {
        Self::from_boxed(Box::new(writer), options)
    }

    pub fn from_boxed(writer: Box<dyn Write + Send>, options: HandlerOptions) -> Self {
        JsonHandler {
            writer: Arc::new(Mutex::new(writer)),
            options: Arc::new(options),
            preformatted: Map::new(),
            groups: Vec::new(),
        }
    }

    pub fn stdout(options: HandlerOptions) -> Self {
        Self::new(std::io::stdout(), options)
    }

    fn builtin(&self, attr: Attr) -> Attr {
        match &self.options.replace_attr {
            Some(replace) => replace(attr),
            None => attr,
        }
    }

    /// Encode `record` as a single JSON line.
    pub fn encode(&self, record: &Record) -> Result<Vec<u8>, HandlerError> {
        let mut root = Map::new();

        let mut builtins = vec![
            attr::string(
                TIME_KEY,
                record.time.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ),
            attr::string(LEVEL_KEY, record.level.as_str()),
        ];
        if self.options.add_source {
            if let Some(source) = &record.source {
                builtins.push(Attr::new(
                    SOURCE_KEY,
                    AttrValue::Structured(serde_json::to_value(source)?),
                ));
            }
        }
        builtins.push(attr::string(MESSAGE_KEY, record.message.as_str()));

        for builtin in builtins {
            insert_attr(&mut root, &self.builtin(builtin));
        }

        for (key, value) in &self.preformatted {
            merge_entry(&mut root, key.clone(), value.clone());
        }

        let mut local = Map::new();
        for attr in &record.attrs {
            insert_attr(&mut local, attr);
        }
        if !local.is_empty() {
            for (key, value) in nest(&self.groups, local) {
                merge_entry(&mut root, key, value);
            }
        }

        let mut line = serde_json::to_vec(&Value::Object(root))?;
        line.push(b'\n');
        Ok(line)
    }
}

impl RecordHandler for JsonHandler {
    fn enabled(&self, level: Level) -> bool {
        level >= self.options.min_level
    }

    fn handle(&self, _ctx: &Context, record: Record) -> Result<(), HandlerError> {
        let line = self.encode(&record)?;
        let mut writer = self.writer.lock().map_err(|_| HandlerError::Poisoned)?;
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn RecordHandler> {
        let mut handler = self.clone();
        let mut local = Map::new();
        for attr in &attrs {
            insert_attr(&mut local, attr);
        }
        if !local.is_empty() {
            for (key, value) in nest(&self.groups, local) {
                merge_entry(&mut handler.preformatted, key, value);
            }
        }
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

/// Insert `attr` into `map`, skipping empty groups and inlining groups with
/// an empty key.
pub(crate) fn insert_attr(map: &mut Map<String, Value>, attr: &Attr) {
    if attr.is_empty_group() {
        return;
    }
    match &attr.value {
        AttrValue::Group(members) if attr.key.is_empty() => {
            for member in members {
                insert_attr(map, member);
            }
        }
        value => merge_entry(map, attr.key.clone(), value.to_json()),
    }
}

/// Objects under the same key are merged; anything else is replaced.
fn merge_entry(map: &mut Map<String, Value>, key: String, value: Value) {
    if let Value::Object(incoming) = value {
        if let Some(Value::Object(existing)) = map.get_mut(&key) {
            for (k, v) in incoming {
                merge_entry(existing, k, v);
            }
            return;
        }
        map.insert(key, Value::Object(incoming));
        return;
    }
    map.insert(key, value);
}

fn nest(groups: &[String], map: Map<String, Value>) -> Map<String, Value> {
    groups.iter().rev().fold(map, |inner, group| {
        let mut outer = Map::new();
        outer.insert(group.clone(), Value::Object(inner));
        outer
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::SharedBuffer;
    use crate::schema::cloud_replacer;
    use serde_json::json;

    fn handler(buffer: &SharedBuffer) -> JsonHandler {
        JsonHandler::new(
            buffer.clone(),
            HandlerOptions {
                min_level: Level::Info,
                add_source: false,
                replace_attr: None,
            },
        )
    }

    #[test]
    fn writes_one_line_per_record() {
        let buffer = SharedBuffer::default();
        let h = handler(&buffer);

        let mut record = Record::new(Level::Info, "hello");
        record.add_attrs([attr::int("n", 1)]);
        h.handle(&Context::background(), record).expect("write");
        h.handle(&Context::background(), Record::new(Level::Warn, "again"))
            .expect("write");

        let lines = buffer.json_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["msg"], "hello");
        assert_eq!(lines[0]["level"], "INFO");
        assert_eq!(lines[0]["n"], 1);
        assert_eq!(lines[1]["level"], "WARN");
    }

    #[test]
    fn enabled_honours_floor() {
        let h = handler(&SharedBuffer::default());
        assert!(!h.enabled(Level::Debug));
        assert!(h.enabled(Level::Info));
        assert!(h.enabled(Level::Fatal));
    }

    #[test]
    fn groups_nest_later_attributes() {
        let buffer = SharedBuffer::default();
        let h = handler(&buffer)
            .with_attrs(vec![attr::string("app", "svc")])
            .with_group("req")
            .with_attrs(vec![attr::string("id", "42")]);

        let mut record = Record::new(Level::Info, "grouped");
        record.add_attrs([attr::int("status", 200)]);
        h.handle(&Context::background(), record).expect("write");

        let line = &buffer.json_lines()[0];
        assert_eq!(line["app"], "svc");
        assert_eq!(line["req"], json!({"id": "42", "status": 200}));
    }

    #[test]
    fn empty_group_is_omitted() {
        let buffer = SharedBuffer::default();
        let h = handler(&buffer).with_group("empty");
        h.handle(&Context::background(), Record::new(Level::Info, "m"))
            .expect("write");

        assert!(buffer.json_lines()[0].get("empty").is_none());
    }

    #[test]
    fn repeated_labels_are_merged() {
        let buffer = SharedBuffer::default();
        let h = handler(&buffer).with_attrs(vec![attr::label("team", "core")]);

        let mut record = Record::new(Level::Info, "labelled");
        record.add_attrs([attr::label("user", "7")]);
        h.handle(&Context::background(), record).expect("write");

        assert_eq!(
            buffer.json_lines()[0]["logging.googleapis.com/labels"],
            json!({"team": "core", "user": "7"})
        );
    }

    #[test]
    fn later_duplicate_key_wins() {
        let buffer = SharedBuffer::default();
        let h = handler(&buffer);

        let mut record = Record::new(Level::Info, "dup");
        record.add_attrs([attr::string("k", "first"), attr::string("k", "second")]);
        h.handle(&Context::background(), record).expect("write");

        assert_eq!(buffer.json_lines()[0]["k"], "second");
    }

    #[test]
    fn replacer_rewrites_builtins() {
        let buffer = SharedBuffer::default();
        let h = JsonHandler::new(
            buffer.clone(),
            HandlerOptions {
                min_level: Level::Debug,
                add_source: true,
                replace_attr: Some(Arc::new(cloud_replacer)),
            },
        );

        let record = Record::new(Level::Error, "boom").with_source(crate::record::SourceLocation {
            file: "src/main.rs",
            line: 12,
        });
        h.handle(&Context::background(), record).expect("write");

        let line = &buffer.json_lines()[0];
        assert_eq!(line["severity"], "ERROR");
        assert_eq!(line["message"], "boom");
        assert!(line.get("timestamp").is_some());
        assert_eq!(
            line["logging.googleapis.com/sourceLocation"],
            json!({"file": "src/main.rs", "line": 12})
        );
        assert!(line.get("msg").is_none());
    }
}
