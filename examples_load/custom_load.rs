use std::io;
use std::time::Instant;
use tracing::info;

use cloud_logging::init::init_tracing;
use cloud_logging::{Level, Logger, LoggerConfig};

fn main() {
    let logger = Logger::new(LoggerConfig {
        service_name: "custom-load".to_string(),
        min_level: Level::Info,
        add_source: false,
        output: Some(Box::new(io::sink())),
        ..LoggerConfig::default()
    });

    if let Err(e) = init_tracing(logger) {
        eprintln!("{}", e);
        return;
    }

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        info!(iteration = i, "custom load test event");
    }

    let elapsed = start.elapsed();
    println!("tracing bridge: wrote {} records in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}
