use crate::attr::{self, Attr};
use crate::context::Context;
use crate::error::BoxError;
use crate::level::Level;
use crate::logger::Logger;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Request, Response, ResponseBuilderExt, StatusCode, Version};
use std::time::Instant;

const LOG_TYPE_KEY: &str = "log_type";
const LOG_TYPE_EXTERNAL_REQUEST: &str = "external_request";
const HTTP_STATUS_CODE_KEY: &str = "http_status_code";

pub const CALLED_MESSAGE: &str = "called external service";
pub const FAILED_MESSAGE: &str = "call to external service FAILED";

/// Renders an outgoing request for the log.
pub type RequestDumper = fn(&Request) -> String;

/// Renders a received response for the log from its buffered parts.
pub type ResponseDumper = fn(StatusCode, Version, &HeaderMap, &[u8]) -> String;

/// An HTTP transport: sends one request and returns its response.
///
/// The context travels with the request so that implementations can pick up
/// the caller's logger and trace.
#[async_trait]
pub trait RoundTrip: Send + Sync {
    async fn round_trip(&self, ctx: &Context, request: Request) -> Result<Response, BoxError>;
}

#[async_trait]
impl RoundTrip for reqwest::Client {
    async fn round_trip(&self, _ctx: &Context, request: Request) -> Result<Response, BoxError> {
        Ok(self.execute(request).await?)
    }
}

/// Level used for responses that arrived with a 4xx/5xx status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Every received response is logged at Info.
    #[default]
    AlwaysInfo,
    /// 4xx and 5xx responses are logged at Error.
    ErrorOnFailureStatus,
}

/// Options for [`LoggingTransport`].
///
/// **Fields**
/// - `request_dumper`: renders the request; `None` omits the `request` field.
/// - `response_dumper`: renders the response; `None` omits the `response`
///   field and leaves the body unread.
/// - `status_policy`: level for error-status responses.
#[derive(Debug, Clone, Copy)]
pub struct LoggingOptions {
    pub request_dumper: Option<RequestDumper>,
    pub response_dumper: Option<ResponseDumper>,
    pub status_policy: StatusPolicy,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            request_dumper: Some(dump_request),
            response_dumper: Some(dump_response),
            status_policy: StatusPolicy::default(),
        }
    }
}

/// [`RoundTrip`] decorator logging every outbound call with its timing.
///
/// The logger bound to the request's [`Context`] is preferred over the
/// transport's own, so records from inside a traced handler carry its trace.
/// Transport errors are logged at Error and returned unchanged; received
/// responses are logged and returned to the caller.
pub struct LoggingTransport<T> {
    inner: T,
    logger: Logger,
    options: LoggingOptions,
}

impl<T: RoundTrip> LoggingTransport<T> {
    pub fn new(inner: T, logger: Logger) -> Self {
        Self::with_options(inner, logger, LoggingOptions::default())
    }

    pub fn with_options(inner: T, logger: Logger, options: LoggingOptions) -> Self {
        LoggingTransport {
            inner,
            logger,
            options,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: RoundTrip> RoundTrip for LoggingTransport<T> {
    async fn round_trip(&self, ctx: &Context, request: Request) -> Result<Response, BoxError> {
        let logger = ctx.logger().unwrap_or(&self.logger);

        let mut attrs: Vec<Attr> = vec![attr::string("url", request.url().as_str())];
        if let Some(dump) = self.options.request_dumper {
            attrs.push(attr::string("request", dump(&request)));
        }
        attrs.push(attr::string(LOG_TYPE_KEY, LOG_TYPE_EXTERNAL_REQUEST));

        let start = Instant::now();
        let result = self.inner.round_trip(ctx, request).await;
        let elapsed = start.elapsed();

        attrs.push(attr::duration("duration", elapsed));
        attrs.push(attr::int64(
            "duration_ms",
            i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX),
        ));

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                attrs.push(attr::error(err.as_ref()));
                logger.error_ctx(ctx, FAILED_MESSAGE, &attrs);
                return Err(err);
            }
        };

        let status = response.status();
        let response = match self.options.response_dumper {
            Some(dump) => {
                let (response, text) = buffer_response(response, dump).await;
                attrs.push(attr::string("response", text));
                response
            }
            None => response,
        };
        attrs.push(attr::int(HTTP_STATUS_CODE_KEY, i64::from(status.as_u16())));

        let failed = status.is_client_error() || status.is_server_error();
        let level = match self.options.status_policy {
            StatusPolicy::ErrorOnFailureStatus if failed => Level::Error,
            _ => Level::Info,
        };
        logger.log(ctx, level, CALLED_MESSAGE, &attrs);
        Ok(response)
    }
}

/// Read the body so it can be logged, then hand back the same response with
/// the buffered body.
///
/// Status, version, headers, URL and extensions are carried over. A body
/// that fails to read is logged as a dump error and returned empty.
async fn buffer_response(mut response: Response, dump: ResponseDumper) -> (Response, String) {
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();
    let url = response.url().clone();
    let extensions = std::mem::take(response.extensions_mut());

    let (body, text) = match response.bytes().await {
        Ok(body) => {
            let text = dump(status, version, &headers, &body);
            (body, text)
        }
        Err(e) => (Default::default(), format!("error dumping response: {}", e)),
    };

    let mut rebuilt = http::Response::new(body);
    *rebuilt.status_mut() = status;
    *rebuilt.version_mut() = version;
    *rebuilt.headers_mut() = headers;
    // The URL can only be attached through the builder extension.
    let mut carrier = http::Response::builder().url(url);
    if let Some(url_ext) = carrier.extensions_mut() {
        rebuilt.extensions_mut().extend(std::mem::take(url_ext));
    }
    rebuilt.extensions_mut().extend(extensions);
    (Response::from(rebuilt), text)
}

/// Request line, headers and body in HTTP/1.1 wire form.
pub fn dump_request(request: &Request) -> String {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut out = format!("{} {} HTTP/1.1\r\n", request.method(), target);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => out.push_str(&format!("Host: {}:{}\r\n", host, port)),
            None => out.push_str(&format!("Host: {}\r\n", host)),
        }
    }
    write_headers(&mut out, request.headers());
    out.push_str("\r\n");

    if let Some(body) = request.body() {
        match body.as_bytes() {
            Some(bytes) => out.push_str(&String::from_utf8_lossy(bytes)),
            None => out.push_str("[streaming body]"),
        }
    }
    out
}

/// Status line, headers and body of a buffered response.
pub fn dump_response(status: StatusCode, version: Version, headers: &HeaderMap, body: &[u8]) -> String {
    let mut out = format!("{:?} {}\r\n", version, status);
    write_headers(&mut out, headers);
    out.push_str("\r\n");
    out.push_str(&String::from_utf8_lossy(body));
    out
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        out.push_str(&format!(
            "{}: {}\r\n",
            name,
            String::from_utf8_lossy(value.as_bytes())
        ));
    }
}
