use std::time::Instant;
use tracing::{error, info};

use couchbase_log_sink::copying::CopyingSink;
use couchbase_log_sink::enrich::EnrichingSink;
use couchbase_log_sink::event::LogLevel;
use couchbase_log_sink::init::{init_tracing_with_config, LayerConfig};
use couchbase_log_sink::memory_sink::NoopSink;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Every event is copied before the enricher mutates it, which is the
    // worst case for the pipeline's per-event cost.
    let enricher = EnrichingSink::new(NoopSink)
        .with_property("App", "load-test")?
        .with_property("Host", "localhost")?;
    let sink = CopyingSink::new(enricher);

    let layer_config = LayerConfig {
        min_level: LogLevel::Info,
        enable_stdout: false,
    };

    init_tracing_with_config(sink, layer_config)?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        if i % 2 == 0 {
            error!(target: "load", iteration = i, "custom load test error");
        } else {
            info!(target: "load", iteration = i, payload = %"x".repeat(64), "custom load test info");
        }
    }

    let elapsed = start.elapsed();
    println!("custom config: emitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
