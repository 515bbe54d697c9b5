use async_trait::async_trait;
use couchbase_log_sink::copying::CopyingSink;
use couchbase_log_sink::enrich::EnrichingSink;
use couchbase_log_sink::event::LogEvent;
use couchbase_log_sink::memory_sink::CollectingSink;
use couchbase_log_sink::sink::{BatchSink, LogEventSink, SinkError};
use std::sync::Arc;

/// Example of integrating a completely custom backend by implementing
/// the `BatchSink` trait directly. Imagine this talks to some
/// proprietary DB for which this crate does not provide a built-in
/// sink.
struct MyCustomDbSink;

#[async_trait]
impl BatchSink for MyCustomDbSink {
    async fn emit_batch(&self, events: Vec<LogEvent>) -> Result<(), SinkError> {
        // Here you would call your own client library for the target DB.
        // For the sake of example we just print the events.
        for event in events {
            println!("[my-custom-db] {} {}", event.level, event.render_message());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Stand-in for the submit side of a batching helper.
    let queue = Arc::new(CollectingSink::new());
    let pipeline = CopyingSink::new(
        EnrichingSink::new(Arc::clone(&queue)).with_property("Db", "my-custom-db")?,
    );

    let mut event = LogEvent::new(couchbase_log_sink::LogLevel::Error, "simulated error in {Db}");
    pipeline.emit(&mut event)?;

    MyCustomDbSink.emit_batch(queue.take()).await?;
    Ok(())
}
