use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use couchbase_log_sink::copying::CopyingSink;
use couchbase_log_sink::init::init_tracing;
use couchbase_log_sink::memory_sink::NoopSink;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink = CopyingSink::new(Arc::new(NoopSink));
    init_tracing(sink)?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(target: "load", iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: emitted {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
