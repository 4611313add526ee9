use crate::attr::Attr;
use crate::context::Context;
use crate::error::HandlerError;
use crate::level::Level;
use crate::record::Record;
use std::sync::Arc;

/// Destination for [`Record`]s produced by a [`Logger`](crate::logger::Logger).
///
/// Implementations either write records somewhere (JSON stream, memory) or
/// decorate another handler. All calls happen synchronously on the logging
/// thread, so implementations must be safe to share between threads.
pub trait RecordHandler: Send + Sync {
    /// Whether a record at `level` would be handled.
    ///
    /// Callers check this before building a record, so returning `false`
    /// skips all decoration work.
    fn enabled(&self, level: Level) -> bool;

    /// Handle a single record.
    ///
    /// **Parameters**
    /// - `ctx`: context the record was logged with.
    /// - `record`: the record; handlers may decorate it before passing it on.
    ///
    /// **Returns**
    /// - `Ok(())` once the record was written.
    /// - `Err(..)` if encoding or writing failed.
    fn handle(&self, ctx: &Context, record: Record) -> Result<(), HandlerError>;

    /// Derive a handler that adds `attrs` to every record.
    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn RecordHandler>;

    /// Derive a handler that nests subsequent attributes under `name`.
    fn with_group(&self, name: &str) -> Arc<dyn RecordHandler>;
}
