use cloud_logging::attr;
use cloud_logging::memory::SharedBuffer;
use cloud_logging::{Context, Level, Logger, LoggerConfig, SpanContext};
use serde_json::json;

fn logger(buffer: &SharedBuffer, project_id: Option<&str>, min_level: Level) -> Logger {
    Logger::new(LoggerConfig {
        project_id: project_id.map(str::to_string),
        service_name: "test-service".to_string(),
        min_level,
        output: Some(Box::new(buffer.clone())),
        ..LoggerConfig::default()
    })
}

fn traced_context() -> Context {
    Context::background().with_span_context(SpanContext::new(
        [
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ],
        [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
        false,
    ))
}

#[test]
fn trace_is_qualified_with_project() {
    let buffer = SharedBuffer::default();
    let log = logger(&buffer, Some("test-project"), Level::Debug);

    log.info_ctx(
        &traced_context(),
        "This is a test log message",
        &[attr::string("key", "value")],
    );

    let lines = buffer.json_lines();
    assert_eq!(lines.len(), 1);
    let line = &lines[0];
    assert_eq!(
        line["logging.googleapis.com/trace"],
        "projects/test-project/traces/0102030405060708090a0b0c0d0e0f10"
    );
    assert_eq!(line["logging.googleapis.com/spanId"], "0102030405060708");
    assert_eq!(line["logging.googleapis.com/trace_sampled"], false);
    assert_eq!(line["key"], "value");
}

#[test]
fn emits_cloud_logging_schema() {
    let buffer = SharedBuffer::default();
    let log = logger(&buffer, None, Level::Debug);

    log.info("hello", &[attr::labels(&["tenant", "acme"])]);

    let line = &buffer.json_lines()[0];
    assert_eq!(line["severity"], "INFO");
    assert_eq!(line["message"], "hello");
    assert!(line["timestamp"].as_str().is_some_and(|t| t.ends_with('Z')));
    assert_eq!(line["serviceContext"], json!({"service": "test-service"}));
    assert_eq!(line["logging.googleapis.com/labels"], json!({"tenant": "acme"}));
    assert_eq!(
        line["logging.googleapis.com/sourceLocation"]["file"],
        file!()
    );
    assert!(line.get("stacktrace").is_none());
    assert!(line.get("logging.googleapis.com/trace").is_none());
}

#[test]
fn severity_vocabulary() {
    let buffer = SharedBuffer::default();
    let log = logger(&buffer, None, Level::Debug);

    log.debug("d", &[]);
    log.warn("w", &[]);
    log.error("e", &[]);
    log.log(&Context::background(), Level::DPanic, "dp", &[]);
    log.log(&Context::background(), Level::Panic, "p", &[]);
    log.log(&Context::background(), Level::Fatal, "f", &[]);

    let severities: Vec<_> = buffer
        .json_lines()
        .iter()
        .map(|l| l["severity"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        severities,
        ["DEBUG", "WARNING", "ERROR", "ERROR", "CRITICAL", "EMERGENCY"]
    );
}

#[test]
fn records_below_floor_are_not_written() {
    let buffer = SharedBuffer::default();
    let log = logger(&buffer, None, Level::Warn);

    log.debug("nope", &[]);
    log.info_ctx(&traced_context(), "nope", &[attr::int("n", 1)]);
    assert!(buffer.is_empty());

    log.warn("yes", &[]);
    assert_eq!(buffer.json_lines().len(), 1);
}

#[test]
fn warnings_carry_a_stacktrace() {
    let buffer = SharedBuffer::default();
    let log = logger(&buffer, None, Level::Debug);

    log.warn("careful", &[]);

    let line = &buffer.json_lines()[0];
    let stack = line["stacktrace"].as_str().unwrap_or_default();
    assert!(!stack.is_empty());

    let first_frame = stack.lines().next().unwrap_or_default();
    assert!(first_frame.trim_start().starts_with(|c: char| c.is_ascii_digit()));
    assert!(!first_frame.contains("cloud_logging::"), "{first_frame}");
    assert!(!first_frame.contains("std::backtrace"), "{first_frame}");
    assert!(stack.contains("warnings_carry_a_stacktrace"));
}

#[test]
fn context_fields_and_call_site_overrides() {
    let buffer = SharedBuffer::default();
    let log = logger(&buffer, None, Level::Debug);
    let ctx = Context::background()
        .with_fields([attr::string("request_id", "r-1"), attr::string("user", "ambient")]);

    log.bind(&ctx).info("handled", &[attr::string("user", "explicit")]);

    let line = &buffer.json_lines()[0];
    assert_eq!(line["request_id"], "r-1");
    assert_eq!(line["user"], "explicit");
}

#[test]
fn logger_bound_to_context_is_found() {
    let buffer = SharedBuffer::default();
    let log = logger(&buffer, None, Level::Debug);
    let ctx = Context::background().with_logger(log.with(&[attr::string("scope", "request")]));

    match ctx.logger() {
        Some(bound) => bound.info_ctx(&ctx, "from context", &[]),
        None => panic!("logger should be bound"),
    }

    assert_eq!(buffer.json_lines()[0]["scope"], "request");
}
