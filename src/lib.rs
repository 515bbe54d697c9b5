pub mod event;
pub mod sink;
pub mod copying;
pub mod aggregate;
pub mod enrich;
pub mod memory_sink;
pub mod layer;
pub mod init;
pub mod env;
pub mod store;
pub mod couchbase;

pub use copying::CopyingSink;
pub use event::{LogEvent, LogLevel, PropertyValue};
pub use sink::{BatchSink, LogEventSink, SinkError};
