//! Request-scoped logging context.
//!
//! A [`Context`] is an immutable value passed explicitly down the call chain.
//! Every `with_*` method returns a new context and leaves the receiver
//! untouched, so contexts can be shared across threads and derived from
//! concurrently.

use crate::attr::Attr;
use crate::logger::Logger;
use std::fmt;
use std::sync::Arc;

/// Ambient state carried by a call: a bound logger, ambient attributes and
/// the current span context.
#[derive(Clone, Default)]
pub struct Context {
    logger: Option<Logger>,
    fields: Arc<Vec<Attr>>,
    span: Option<SpanContext>,
}

impl Context {
    /// Empty root context.
    pub fn background() -> Self {
        Context::default()
    }

    /// Derive a context carrying `logger`.
    pub fn with_logger(&self, logger: Logger) -> Self {
        Context {
            logger: Some(logger),
            ..self.clone()
        }
    }

    /// Logger bound with [`Context::with_logger`], if any.
    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    /// Derive a context whose ambient attributes are this context's followed
    /// by `attrs`. The parent's set is copied, never mutated.
    pub fn with_fields(&self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        let mut fields = Vec::clone(&self.fields);
        fields.extend(attrs);
        Context {
            fields: Arc::new(fields),
            ..self.clone()
        }
    }

    /// Ambient attributes added to every record logged with this context.
    pub fn fields(&self) -> &[Attr] {
        &self.fields
    }

    pub fn with_span_context(&self, span: SpanContext) -> Self {
        Context {
            span: Some(span),
            ..self.clone()
        }
    }

    pub fn span_context(&self) -> Option<&SpanContext> {
        self.span.as_ref()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("has_logger", &self.logger.is_some())
            .field("fields", &self.fields)
            .field("span", &self.span)
            .finish()
    }
}

/// 16-byte trace identifier, displayed as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraceId(pub [u8; 16]);

/// 8-byte span identifier, displayed as lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanId(pub [u8; 8]);

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Trace/span identifiers plus the sampling decision of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanContext {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub sampled: bool,
}

impl SpanContext {
    pub fn new(trace_id: [u8; 16], span_id: [u8; 8], sampled: bool) -> Self {
        SpanContext {
            trace_id: TraceId(trace_id),
            span_id: SpanId(span_id),
            sampled,
        }
    }

    /// Both identifiers must be non-zero.
    pub fn is_valid(&self) -> bool {
        self.trace_id.0 != [0; 16] && self.span_id.0 != [0; 8]
    }

    /// Parse a W3C `traceparent` header, e.g.
    /// `00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01`.
    ///
    /// Returns `None` for malformed headers and for all-zero identifiers.
    pub fn from_traceparent(header: &str) -> Option<Self> {
        let mut parts = header.trim().split('-');
        let version = parts.next()?;
        let trace = parts.next()?;
        let span = parts.next()?;
        let flags = parts.next()?;

        if version.len() != 2 || version.eq_ignore_ascii_case("ff") || flags.len() != 2 {
            return None;
        }
        // Version 00 has exactly four fields; later versions may append more.
        if version == "00" && parts.next().is_some() {
            return None;
        }

        let mut trace_id = [0u8; 16];
        let mut span_id = [0u8; 8];
        let mut flag = [0u8; 1];
        hex::decode_to_slice(trace, &mut trace_id).ok()?;
        hex::decode_to_slice(span, &mut span_id).ok()?;
        hex::decode_to_slice(flags, &mut flag).ok()?;

        let sc = SpanContext::new(trace_id, span_id, flag[0] & 0x01 == 0x01);
        sc.is_valid().then_some(sc)
    }
}

/// Source of the span context associated with a [`Context`].
///
/// Lets applications plug in whatever tracing library they run.
pub trait SpanContextProvider: Send + Sync {
    fn span_context(&self, ctx: &Context) -> Option<SpanContext>;
}

/// Provider reading the span context stored with
/// [`Context::with_span_context`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextSpanProvider;

impl SpanContextProvider for ContextSpanProvider {
    fn span_context(&self, ctx: &Context) -> Option<SpanContext> {
        ctx.span_context().copied()
    }
}
