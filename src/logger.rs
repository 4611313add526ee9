use crate::attr::{self, Attr};
use crate::context::{Context, SpanContextProvider};
use crate::error::HandlerError;
use crate::handler::RecordHandler;
use crate::json::{HandlerOptions, JsonHandler};
use crate::level::Level;
use crate::record::{Record, SourceLocation};
use crate::schema::cloud_replacer;
use crate::trace::TraceContextHandler;
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::sync::Arc;

/// Configuration for [`Logger::new`].
///
/// **Fields**
/// - `project_id`: GCP project used to qualify trace IDs; `None` writes bare IDs.
/// - `service_name`: written as `serviceContext.service` on every record.
/// - `min_level`: severity floor; lower records are dropped.
/// - `add_source`: write the call site as `logging.googleapis.com/sourceLocation`.
/// - `output`: destination stream, stdout when `None`.
/// - `span_provider`: where span contexts come from; defaults to the
///   span stored on the [`Context`].
pub struct LoggerConfig {
    pub project_id: Option<String>,
    pub service_name: String,
    pub min_level: Level,
    pub add_source: bool,
    pub output: Option<Box<dyn Write + Send>>,
    pub span_provider: Option<Arc<dyn SpanContextProvider>>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            service_name: String::new(),
            min_level: Level::Info,
            add_source: true,
            output: None,
            span_provider: None,
        }
    }
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerConfig")
            .field("project_id", &self.project_id)
            .field("service_name", &self.service_name)
            .field("min_level", &self.min_level)
            .field("add_source", &self.add_source)
            .field("output", &self.output.as_ref().map(|_| "custom"))
            .finish_non_exhaustive()
    }
}

/// Structured logger writing Cloud Logging JSON.
///
/// Cheap to clone; clones share the same handler. Derived loggers
/// ([`Logger::with`], [`Logger::with_group`]) never modify the receiver.
#[derive(Clone)]
pub struct Logger {
    handler: Arc<dyn RecordHandler>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}

impl Logger {
    /// Build the standard pipeline: a JSON handler on the configured output,
    /// filtered at `min_level` and remapped to Cloud Logging keys, wrapped in
    /// a [`TraceContextHandler`], with the service context bound.
    pub fn new(config: LoggerConfig) -> Self {
        let options = HandlerOptions {
            min_level: config.min_level,
            add_source: config.add_source,
            replace_attr: Some(Arc::new(cloud_replacer)),
        };
        let json = match config.output {
            Some(output) => JsonHandler::from_boxed(output, options),
            None => JsonHandler::stdout(options),
        };

        let mut traced = TraceContextHandler::new(Arc::new(json), config.project_id);
        if let Some(provider) = config.span_provider {
            traced = traced.with_provider(provider);
        }

        Logger::from_handler(Arc::new(traced))
            .with(&[attr::service_context(config.service_name)])
    }

    /// Logger over an arbitrary handler, without any decoration.
    pub fn from_handler(handler: Arc<dyn RecordHandler>) -> Self {
        Logger { handler }
    }

    pub fn handler(&self) -> &Arc<dyn RecordHandler> {
        &self.handler
    }

    /// Logger that adds `attrs` to every record.
    pub fn with(&self, attrs: &[Attr]) -> Logger {
        if attrs.is_empty() {
            return self.clone();
        }
        Logger {
            handler: self.handler.with_attrs(attrs.to_vec()),
        }
    }

    /// Logger that nests subsequent attributes under `name`.
    pub fn with_group(&self, name: &str) -> Logger {
        Logger {
            handler: self.handler.with_group(name),
        }
    }

    /// Pair this logger with `ctx`.
    pub fn bind(&self, ctx: &Context) -> ContextLogger {
        ContextLogger {
            ctx: ctx.clone(),
            logger: self.clone(),
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    /// Log a record and return the handler's result.
    ///
    /// Disabled levels return `Ok(())` without building a record.
    #[track_caller]
    pub fn try_log(
        &self,
        ctx: &Context,
        level: Level,
        msg: &str,
        attrs: &[Attr],
    ) -> Result<(), HandlerError> {
        if !self.enabled(level) {
            return Ok(());
        }
        let mut record =
            Record::new(level, msg).with_source(SourceLocation::from(Location::caller()));
        record.add_attrs(attrs.iter().cloned());
        self.handler.handle(ctx, record)
    }

    /// Log a record; a failed write is reported on stderr.
    #[track_caller]
    pub fn log(&self, ctx: &Context, level: Level, msg: &str, attrs: &[Attr]) {
        if let Err(e) = self.try_log(ctx, level, msg, attrs) {
            eprintln!("failed to write log record: {}", e);
        }
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, attrs: &[Attr]) {
        self.log(&Context::background(), Level::Debug, msg, attrs);
    }

    #[track_caller]
    pub fn info(&self, msg: &str, attrs: &[Attr]) {
        self.log(&Context::background(), Level::Info, msg, attrs);
    }

    #[track_caller]
    pub fn warn(&self, msg: &str, attrs: &[Attr]) {
        self.log(&Context::background(), Level::Warn, msg, attrs);
    }

    #[track_caller]
    pub fn error(&self, msg: &str, attrs: &[Attr]) {
        self.log(&Context::background(), Level::Error, msg, attrs);
    }

    #[track_caller]
    pub fn debug_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) {
        self.log(ctx, Level::Debug, msg, attrs);
    }

    #[track_caller]
    pub fn info_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) {
        self.log(ctx, Level::Info, msg, attrs);
    }

    #[track_caller]
    pub fn warn_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) {
        self.log(ctx, Level::Warn, msg, attrs);
    }

    #[track_caller]
    pub fn error_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) {
        self.log(ctx, Level::Error, msg, attrs);
    }

    /// Log at [`Level::DPanic`]; panics afterwards in debug builds only.
    #[track_caller]
    pub fn dpanic_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) {
        self.log(ctx, Level::DPanic, msg, attrs);
        if cfg!(debug_assertions) {
            panic!("{}", msg);
        }
    }

    #[track_caller]
    pub fn dpanic(&self, msg: &str, attrs: &[Attr]) {
        self.dpanic_ctx(&Context::background(), msg, attrs);
    }

    /// Log at [`Level::Panic`], then panic with `msg`.
    ///
    /// The record is written before unwinding starts.
    #[track_caller]
    pub fn panic_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) -> ! {
        self.log(ctx, Level::Panic, msg, attrs);
        panic!("{}", msg);
    }

    #[track_caller]
    pub fn panic(&self, msg: &str, attrs: &[Attr]) -> ! {
        self.panic_ctx(&Context::background(), msg, attrs)
    }

    /// Log at [`Level::Fatal`], then exit the process with status 1.
    ///
    /// Handlers write synchronously, so the record has reached the output
    /// before the process ends.
    #[track_caller]
    pub fn fatal_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) -> ! {
        self.log(ctx, Level::Fatal, msg, attrs);
        std::process::exit(1)
    }

    #[track_caller]
    pub fn fatal(&self, msg: &str, attrs: &[Attr]) -> ! {
        self.fatal_ctx(&Context::background(), msg, attrs)
    }
}

/// A [`Logger`] bound to a [`Context`].
#[derive(Clone, Debug)]
pub struct ContextLogger {
    ctx: Context,
    logger: Logger,
}

impl ContextLogger {
    pub fn new(ctx: Context, logger: Logger) -> Self {
        ContextLogger { ctx, logger }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn with(&self, attrs: &[Attr]) -> ContextLogger {
        ContextLogger {
            ctx: self.ctx.clone(),
            logger: self.logger.with(attrs),
        }
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, attrs: &[Attr]) {
        self.logger.debug_ctx(&self.ctx, msg, attrs);
    }

    #[track_caller]
    pub fn info(&self, msg: &str, attrs: &[Attr]) {
        self.logger.info_ctx(&self.ctx, msg, attrs);
    }

    #[track_caller]
    pub fn warn(&self, msg: &str, attrs: &[Attr]) {
        self.logger.warn_ctx(&self.ctx, msg, attrs);
    }

    #[track_caller]
    pub fn error(&self, msg: &str, attrs: &[Attr]) {
        self.logger.error_ctx(&self.ctx, msg, attrs);
    }

    #[track_caller]
    pub fn dpanic(&self, msg: &str, attrs: &[Attr]) {
        self.logger.dpanic_ctx(&self.ctx, msg, attrs);
    }

    #[track_caller]
    pub fn panic(&self, msg: &str, attrs: &[Attr]) -> ! {
        self.logger.panic_ctx(&self.ctx, msg, attrs)
    }

    #[track_caller]
    pub fn fatal(&self, msg: &str, attrs: &[Attr]) -> ! {
        self.logger.fatal_ctx(&self.ctx, msg, attrs)
    }
}
