use crate::event::LogEvent;
use crate::sink::{LogEventSink, SinkError};
use tracing::warn;

/// Fans each event out to several child sinks, in order.
///
/// All children receive the *same* event instance, so a child that mutates
/// it changes what the children after it see. Wrap a child in
/// [`CopyingSink`](crate::copying::CopyingSink) to isolate it.
pub struct AggregateSink {
    sinks: Vec<Box<dyn LogEventSink>>,
    suppress_failures: bool,
}

impl AggregateSink {
    /// Every child is attempted; failures are collected into
    /// [`SinkError::Aggregate`].
    pub fn new(sinks: Vec<Box<dyn LogEventSink>>) -> Self {
        AggregateSink {
            sinks,
            suppress_failures: false,
        }
    }

    /// Every child is attempted; failures are logged and swallowed.
    pub fn safe(sinks: Vec<Box<dyn LogEventSink>>) -> Self {
        AggregateSink {
            sinks,
            suppress_failures: true,
        }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl LogEventSink for AggregateSink {
    fn emit(&self, event: &mut LogEvent) -> Result<(), SinkError> {
        let mut failures = Vec::new();

        for (index, sink) in self.sinks.iter().enumerate() {
            if let Err(e) = sink.emit(event) {
                if self.suppress_failures {
                    warn!(sink = index, error = %e, "failed to emit event to aggregated sink");
                } else {
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SinkError::Aggregate(failures))
        }
    }
}
