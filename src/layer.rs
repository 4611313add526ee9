use crate::attr::{self, Attr};
use crate::context::Context;
use crate::level::Level;
use crate::logger::Logger;
use crate::record::{Record, SourceLocation};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context as LayerContext, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns `tracing` events into records on a
/// [`Logger`].
///
/// Events are converted and handled synchronously on the emitting thread.
/// TRACE events map to Debug; the event target is kept as `target`.
pub struct LoggerLayer {
    logger: Logger,
}

impl LoggerLayer {
    pub fn new(logger: Logger) -> Self {
        LoggerLayer { logger }
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let meta = event.metadata();
        let level = Level::from(*meta.level());
        if !self.logger.enabled(level) {
            return;
        }

        let mut attrs = Vec::new();
        let mut message = None;
        event.record(&mut FieldVisitor {
            attrs: &mut attrs,
            message: &mut message,
        });

        let mut record = Record::new(level, message.unwrap_or_default());
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            record = record.with_source(SourceLocation { file, line });
        }
        record.add_attrs(attrs);
        record.add_attrs([attr::string("target", meta.target())]);

        if let Err(e) = self.logger.handler().handle(&Context::background(), record) {
            eprintln!("failed to write log record: {}", e);
        }
    }
}

/// Collects event fields as attributes; the `message` field becomes the
/// record message.
pub struct FieldVisitor<'a> {
    pub attrs: &'a mut Vec<Attr>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.attrs.push(attr::string(field.name(), value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.attrs.push(attr::int64(field.name(), value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match i64::try_from(value) {
            Ok(v) => self.attrs.push(attr::int64(field.name(), v)),
            Err(_) => self.attrs.push(attr::string(field.name(), value.to_string())),
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.attrs.push(attr::float64(field.name(), value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.attrs.push(attr::boolean(field.name(), value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        let mut error = attr::error(value);
        error.key = field.name().to_string();
        self.attrs.push(error);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.attrs.push(attr::string(field.name(), format!("{:?}", value)));
        }
    }
}
