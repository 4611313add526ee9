use std::io;
use std::time::Instant;

use cloud_logging::attr;
use cloud_logging::{Context, Level, Logger, LoggerConfig, SpanContext};

fn main() {
    let logger = Logger::new(LoggerConfig {
        project_id: Some("load-test".to_string()),
        service_name: "default-load".to_string(),
        min_level: Level::Debug,
        output: Some(Box::new(io::sink())),
        ..LoggerConfig::default()
    });

    let ctx = Context::background()
        .with_span_context(SpanContext::new([0xab; 16], [0xcd; 8], true))
        .with_fields([attr::string("request_id", "r-1")]);

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        logger.info_ctx(
            &ctx,
            "default load test event",
            &[attr::int64("iteration", i as i64)],
        );
    }

    let elapsed = start.elapsed();
    println!("default config: wrote {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
