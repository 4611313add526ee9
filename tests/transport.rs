#![cfg(feature = "http-transport")]

use async_trait::async_trait;
use cloud_logging::attr::AttrValue;
use cloud_logging::error::BoxError;
use cloud_logging::memory::MemoryHandler;
use cloud_logging::trace::TraceContextHandler;
use cloud_logging::transport::{
    LoggingOptions, LoggingTransport, RoundTrip, StatusPolicy, CALLED_MESSAGE, FAILED_MESSAGE,
};
use cloud_logging::{Context, Level, Logger, SpanContext};
use reqwest::{Method, Request, Response, Url};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;

struct Fixed(u16);

#[async_trait]
impl RoundTrip for Fixed {
    async fn round_trip(&self, _ctx: &Context, _request: Request) -> Result<Response, BoxError> {
        let response = http::Response::builder()
            .status(self.0)
            .header("content-type", "text/plain")
            .body("ok")?;
        Ok(Response::from(response))
    }
}

struct Refused;

#[async_trait]
impl RoundTrip for Refused {
    async fn round_trip(&self, _ctx: &Context, _request: Request) -> Result<Response, BoxError> {
        Err(Box::new(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }
}

fn request() -> Request {
    Request::new(
        Method::GET,
        Url::parse("http://example.com/status").expect("url"),
    )
}

fn memory_logger() -> (MemoryHandler, Logger) {
    let sink = MemoryHandler::new();
    let logger = Logger::from_handler(Arc::new(sink.clone()));
    (sink, logger)
}

#[tokio::test]
async fn successful_call_logs_once_at_info() {
    let (sink, logger) = memory_logger();
    let transport = LoggingTransport::new(Fixed(200), logger);

    let response = transport
        .round_trip(&Context::background(), request())
        .await
        .expect("response");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.expect("body"), "ok");

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.level, Level::Info);
    assert_eq!(record.message, CALLED_MESSAGE);
    assert_eq!(
        record.attr("http_status_code").map(|a| &a.value),
        Some(&AttrValue::Int(200))
    );
    assert_eq!(
        record.attr("url").map(|a| &a.value),
        Some(&AttrValue::Str("http://example.com/status".into()))
    );
    assert_eq!(
        record.attr("log_type").map(|a| &a.value),
        Some(&AttrValue::Str("external_request".into()))
    );
    assert!(record.attr("duration").is_some());
    assert!(record.attr("duration_ms").is_some());
    match record.attr("response").map(|a| &a.value) {
        Some(AttrValue::Str(dump)) => {
            assert!(dump.starts_with("HTTP/1.1 200 OK\r\n"));
            assert!(dump.ends_with("\r\n\r\nok"));
        }
        other => panic!("unexpected response field: {other:?}"),
    }
    match record.attr("request").map(|a| &a.value) {
        Some(AttrValue::Str(dump)) => assert!(dump.starts_with("GET /status HTTP/1.1\r\n")),
        other => panic!("unexpected request field: {other:?}"),
    }
}

#[tokio::test]
async fn transport_error_is_logged_and_returned() {
    let (sink, logger) = memory_logger();
    let transport = LoggingTransport::new(Refused, logger);

    let err = transport
        .round_trip(&Context::background(), request())
        .await
        .expect_err("transport error");
    assert_eq!(err.to_string(), "connection refused");

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.level, Level::Error);
    assert_eq!(record.message, FAILED_MESSAGE);
    assert_eq!(
        record.attr("error").map(|a| &a.value),
        Some(&AttrValue::Error("connection refused".into()))
    );
    assert!(record.attr("response").is_none());
}

#[tokio::test]
async fn error_status_follows_policy() {
    let (sink, logger) = memory_logger();
    let lenient = LoggingTransport::new(Fixed(503), logger.clone());
    let strict = LoggingTransport::with_options(
        Fixed(503),
        logger,
        LoggingOptions {
            status_policy: StatusPolicy::ErrorOnFailureStatus,
            ..LoggingOptions::default()
        },
    );

    let first = lenient
        .round_trip(&Context::background(), request())
        .await
        .expect("response");
    let second = strict
        .round_trip(&Context::background(), request())
        .await
        .expect("response");

    assert_eq!(first.status().as_u16(), 503);
    assert_eq!(second.status().as_u16(), 503);
    let levels: Vec<_> = sink.records().iter().map(|r| r.level).collect();
    assert_eq!(levels, [Level::Info, Level::Error]);
}

#[tokio::test]
async fn prefers_logger_from_context() {
    let (default_sink, default_logger) = memory_logger();
    let request_sink = MemoryHandler::new();
    let request_logger = Logger::from_handler(Arc::new(TraceContextHandler::new(
        Arc::new(request_sink.clone()),
        Some("p".to_string()),
    )));
    let ctx = Context::background()
        .with_logger(request_logger)
        .with_span_context(SpanContext::new([7; 16], [9; 8], true));

    let transport = LoggingTransport::new(Fixed(204), default_logger);
    transport.round_trip(&ctx, request()).await.expect("response");

    assert!(default_sink.is_empty());
    let record = &request_sink.records()[0];
    assert_eq!(
        record.attr("logging.googleapis.com/trace").map(|a| &a.value),
        Some(&AttrValue::Str(
            "projects/p/traces/07070707070707070707070707070707".into()
        ))
    );
}

#[tokio::test]
async fn dumping_can_be_disabled() {
    let (sink, logger) = memory_logger();
    let transport = LoggingTransport::with_options(
        Fixed(200),
        logger,
        LoggingOptions {
            request_dumper: None,
            response_dumper: None,
            status_policy: StatusPolicy::AlwaysInfo,
        },
    );

    let response = transport
        .round_trip(&Context::background(), request())
        .await
        .expect("response");
    assert_eq!(response.text().await.expect("body"), "ok");

    let record = &sink.records()[0];
    assert!(record.attr("request").is_none());
    assert!(record.attr("response").is_none());
    assert!(record.attr("http_status_code").is_some());
}

/// Serve one connection with the raw `reply` once the request head is read.
fn serve_once(reply: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut line = String::new();
        while reader.read_line(&mut line).map(|n| n > 0).unwrap_or(false) {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }
        let mut stream = stream;
        let _ = stream.write_all(reply.as_bytes());
        let _ = stream.flush();
    });
    addr
}

fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().expect("client")
}

#[tokio::test]
async fn real_client_response_is_returned_unchanged() {
    let addr = serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
    let url = Url::parse(&format!("http://{}/status", addr)).expect("url");
    let (sink, logger) = memory_logger();
    let transport = LoggingTransport::new(local_client(), logger);

    let response = transport
        .round_trip(&Context::background(), Request::new(Method::GET, url.clone()))
        .await
        .expect("response");

    assert_eq!(response.url(), &url);
    assert_eq!(response.remote_addr(), Some(addr));
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.text().await.expect("body"), "ok");
    assert_eq!(sink.records()[0].message, CALLED_MESSAGE);
}

#[tokio::test]
async fn unreadable_body_still_returns_response() {
    let addr = serve_once(
        "HTTP/1.1 502 Bad Gateway\r\nContent-Length: 100\r\nConnection: close\r\n\r\ntruncated",
    );
    let url = Url::parse(&format!("http://{}/status", addr)).expect("url");
    let (sink, logger) = memory_logger();
    let transport = LoggingTransport::new(local_client(), logger);

    let response = transport
        .round_trip(&Context::background(), Request::new(Method::GET, url.clone()))
        .await
        .expect("response");

    assert_eq!(response.status().as_u16(), 502);
    assert_eq!(response.url(), &url);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.level, Level::Info);
    assert_eq!(record.message, CALLED_MESSAGE);
    assert!(record.attr("error").is_none());
    assert_eq!(
        record.attr("http_status_code").map(|a| &a.value),
        Some(&AttrValue::Int(502))
    );
    match record.attr("response").map(|a| &a.value) {
        Some(AttrValue::Str(text)) => assert!(text.starts_with("error dumping response: ")),
        other => panic!("unexpected response field: {other:?}"),
    }
}
