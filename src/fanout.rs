use crate::attr::Attr;
use crate::context::Context;
use crate::error::HandlerError;
use crate::handler::RecordHandler;
use crate::level::Level;
use crate::record::Record;
use std::sync::Arc;

/// Handler that forwards each record to several handlers.
///
/// A record is offered to every handler enabled for its level. All of them
/// are tried even if one fails; the first error is returned.
#[derive(Clone, Default)]
pub struct FanoutHandler {
    handlers: Vec<Arc<dyn RecordHandler>>,
}

impl FanoutHandler {
    pub fn new(handlers: Vec<Arc<dyn RecordHandler>>) -> Self {
        FanoutHandler { handlers }
    }
}

impl RecordHandler for FanoutHandler {
    fn enabled(&self, level: Level) -> bool {
        self.handlers.iter().any(|h| h.enabled(level))
    }

    fn handle(&self, ctx: &Context, record: Record) -> Result<(), HandlerError> {
        let mut first_err = None;
        for handler in self.handlers.iter().filter(|h| h.enabled(record.level)) {
            if let Err(e) = handler.handle(ctx, record.clone()) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn RecordHandler> {
        Arc::new(FanoutHandler {
            handlers: self
                .handlers
                .iter()
                .map(|h| h.with_attrs(attrs.clone()))
                .collect(),
        })
    }

    fn with_group(&self, name: &str) -> Arc<dyn RecordHandler> {
        Arc::new(FanoutHandler {
            handlers: self.handlers.iter().map(|h| h.with_group(name)).collect(),
        })
    }
}
