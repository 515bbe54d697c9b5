use crate::event::{EventError, LogEvent};
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;

/// Error returned by a [`LogEventSink`].
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    /// The event handed to the sink was malformed.
    #[error("invalid log event: {0}")]
    InvalidInput(#[from] EventError),

    /// The sink's backend failed to accept the event.
    #[error("log sink failed: {0}")]
    Failed(#[source] Box<dyn Error + Send + Sync>),

    /// One or more children of an aggregate sink failed.
    #[error("{} of the aggregated sinks failed", .0.len())]
    Aggregate(Vec<SinkError>),
}

impl SinkError {
    pub fn failed(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        SinkError::Failed(err.into())
    }
}

/// Synchronous pipeline stage that receives [`LogEvent`]s.
///
/// Sinks get mutable access to the event so that enriching stages can add
/// or replace properties before passing it on. Anything a sink changes is
/// visible to every later consumer of the same instance; wrap a sink in
/// [`CopyingSink`](crate::copying::CopyingSink) to give it a private copy.
///
/// Implementations must be safe to call from several threads at once.
pub trait LogEventSink: Send + Sync {
    /// Consume a single event.
    ///
    /// **Returns**
    /// - `Ok(())` if the event was accepted.
    /// - `Err(SinkError::InvalidInput)` if the event was rejected as
    ///   malformed before any work was done.
    /// - Any other `Err(..)` if the sink or a sink it wraps failed.
    fn emit(&self, event: &mut LogEvent) -> Result<(), SinkError>;
}

impl<S: LogEventSink + ?Sized> LogEventSink for Arc<S> {
    fn emit(&self, event: &mut LogEvent) -> Result<(), SinkError> {
        (**self).emit(event)
    }
}

impl<S: LogEventSink + ?Sized> LogEventSink for Box<S> {
    fn emit(&self, event: &mut LogEvent) -> Result<(), SinkError> {
        (**self).emit(event)
    }
}

/// Asynchronous destination for batches of [`LogEvent`]s.
///
/// This is the flush callback a periodic batching helper invokes once a
/// batch is full or its timer fires. Batching, retry and backpressure are
/// the helper's concern; implementations only persist what they are given.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Persist one batch of events, in order.
    async fn emit_batch(&self, events: Vec<LogEvent>) -> Result<(), SinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LogLevel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl LogEventSink for Counting {
        fn emit(&self, _event: &mut LogEvent) -> Result<(), SinkError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn shared_and_boxed_sinks_delegate() {
        let counting = Arc::new(Counting::default());
        let boxed: Box<dyn LogEventSink> = Box::new(Arc::clone(&counting));

        let mut event = LogEvent::new(LogLevel::Info, "x");
        boxed.emit(&mut event).expect("emit");
        counting.emit(&mut event).expect("emit");

        assert_eq!(counting.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn aggregate_error_reports_count() {
        let err = SinkError::Aggregate(vec![
            SinkError::failed("a"),
            SinkError::failed("b"),
        ]);
        assert_eq!(err.to_string(), "2 of the aggregated sinks failed");
    }
}
