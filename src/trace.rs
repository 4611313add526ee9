use crate::attr::{self, Attr};
use crate::context::{Context, ContextSpanProvider, SpanContext, SpanContextProvider};
use crate::error::HandlerError;
use crate::handler::RecordHandler;
use crate::level::Level;
use crate::record::Record;
use crate::schema::{SPAN_ID_KEY, STACKTRACE_KEY, TRACE_KEY, TRACE_SAMPLED_KEY};
use std::backtrace::Backtrace;
use std::sync::Arc;

/// Frames whose symbol contains one of these belong to the capture machinery
/// or to this crate and are cut from the top of a stack trace.
const STACK_SKIP_PREFIXES: &[&str] = &[
    "std::backtrace",
    "backtrace::",
    "cloud_logging::",
    "tracing_core::",
    "tracing_subscriber::",
    "tracing::",
];

/// Handler decorator that enriches records with request context.
///
/// On every record it adds, in order: the ambient attributes of the
/// [`Context`] (ahead of the call-site attributes, so the latter win on
/// duplicate keys), a trimmed stack trace for Warn and above, and the trace,
/// span and sampling fields when the context carries a valid span. The
/// record is then passed to the wrapped handler.
#[derive(Clone)]
pub struct TraceContextHandler {
    inner: Arc<dyn RecordHandler>,
    project_id: Option<Arc<str>>,
    provider: Arc<dyn SpanContextProvider>,
}

impl TraceContextHandler {
    /// Wrap `inner`. With a non-empty `project_id`, trace IDs are written as
    /// `projects/<project_id>/traces/<trace_id>`.
    pub fn new(inner: Arc<dyn RecordHandler>, project_id: Option<String>) -> Self {
        TraceContextHandler {
            inner,
            project_id: project_id.filter(|p| !p.is_empty()).map(Arc::from),
            provider: Arc::new(ContextSpanProvider),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn SpanContextProvider>) -> Self {
        self.provider = provider;
        self
    }

    fn wrap(&self, inner: Arc<dyn RecordHandler>) -> Arc<dyn RecordHandler> {
        Arc::new(TraceContextHandler {
            inner,
            project_id: self.project_id.clone(),
            provider: Arc::clone(&self.provider),
        })
    }

    fn trace_attrs(&self, span: &SpanContext) -> [Attr; 3] {
        let trace = match &self.project_id {
            Some(project) => format!("projects/{}/traces/{}", project, span.trace_id),
            None => span.trace_id.to_string(),
        };
        [
            attr::string(TRACE_KEY, trace),
            attr::string(SPAN_ID_KEY, span.span_id.to_string()),
            attr::boolean(TRACE_SAMPLED_KEY, span.sampled),
        ]
    }
}

impl RecordHandler for TraceContextHandler {
    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    fn handle(&self, ctx: &Context, mut record: Record) -> Result<(), HandlerError> {
        let ambient = ctx.fields();
        if !ambient.is_empty() {
            let own = std::mem::replace(&mut record.attrs, ambient.to_vec());
            record.attrs.extend(own);
        }

        if record.level >= Level::Warn {
            record.add_attrs([attr::string(STACKTRACE_KEY, capture_stack())]);
        }

        if let Some(span) = self.provider.span_context(ctx).filter(SpanContext::is_valid) {
            record.add_attrs(self.trace_attrs(&span));
        }

        self.inner.handle(ctx, record)
    }

    fn with_attrs(&self, attrs: Vec<Attr>) -> Arc<dyn RecordHandler> {
        self.wrap(self.inner.with_attrs(attrs))
    }

    fn with_group(&self, name: &str) -> Arc<dyn RecordHandler> {
        self.wrap(self.inner.with_group(name))
    }
}

fn capture_stack() -> String {
    trim_stack(&Backtrace::force_capture().to_string(), STACK_SKIP_PREFIXES)
}

/// Drop leading frames whose symbol line contains any of `skip`.
///
/// If every frame matches, the trace is returned untouched.
pub fn trim_stack(stack: &str, skip: &[&str]) -> String {
    let lines: Vec<&str> = stack.lines().collect();
    let first_kept = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| is_frame_header(line))
        .find(|(_, line)| !skip.iter().any(|prefix| line.contains(prefix)))
        .map(|(i, _)| i);

    match first_kept {
        Some(start) => lines[start..].join("\n"),
        None => stack.to_string(),
    }
}

// "  12: symbol::path" opens a frame; "at file:line" lines belong to it.
fn is_frame_header(line: &str) -> bool {
    match line.trim_start().split_once(':') {
        Some((index, _)) => !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
