use std::sync::Arc;

use couchbase_log_sink::copying::CopyingSink;
use couchbase_log_sink::couchbase::{CouchbaseConfig, CouchbaseSink};
use couchbase_log_sink::env::{env_or, LOG_SINK_COUCHBASE_SERVERS_ENV};
use couchbase_log_sink::init::init_tracing;
use couchbase_log_sink::memory_sink::CollectingSink;
use couchbase_log_sink::sink::BatchSink;
use couchbase_log_sink::store::MemoryCluster;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let servers = env_or(LOG_SINK_COUCHBASE_SERVERS_ENV, "couchbase://127.0.0.1");
    let config = CouchbaseConfig::new(&servers, "logs")?.with_credentials("Administrator", "password");

    // A real deployment passes a connector backed by the vendor SDK here.
    let cluster = MemoryCluster::new();
    let bucket = cluster.create_bucket(&config.bucket).await;
    let couchbase = CouchbaseSink::connect(&config, &cluster).await?;

    // The collecting sink stands in for the submit side of a batching
    // helper; the copy keeps its queued events independent of the caller.
    let queue = Arc::new(CollectingSink::new());
    init_tracing(CopyingSink::new(Arc::clone(&queue)))?;

    info!(target: "orders", "starting service");
    error!(target: "orders", user_id = 42, reason = "invalid password", "authentication failed");

    // One flush cycle.
    couchbase.emit_batch(queue.take()).await?;

    for (key, document) in bucket.documents().await {
        println!("{key}: {document}");
    }
    Ok(())
}
