use crate::event::LogEvent;
use crate::sink::{LogEventSink, SinkError};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A sink that simply drops all events.
///
/// Useful for measuring the overhead of the pipeline itself without any
/// external I/O, and for unit tests that don't care about persistence.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl LogEventSink for NoopSink {
    fn emit(&self, _event: &mut LogEvent) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A sink that keeps a snapshot of every event it receives, in arrival
/// order, so callers can inspect what reached it.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<LogEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.lock().clone()
    }

    /// Remove and return everything received so far.
    pub fn take(&self) -> Vec<LogEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking test thread must not hide what was collected before it.
    fn lock(&self) -> MutexGuard<'_, Vec<LogEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogEventSink for CollectingSink {
    fn emit(&self, event: &mut LogEvent) -> Result<(), SinkError> {
        self.lock().push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::LogLevel;

    #[test]
    fn collects_in_arrival_order_and_drains() {
        let sink = CollectingSink::new();
        for template in ["first", "second"] {
            sink.emit(&mut LogEvent::new(LogLevel::Info, template))
                .expect("emit");
        }

        let templates: Vec<String> = sink
            .events()
            .iter()
            .map(|e| e.message_template.to_string())
            .collect();
        assert_eq!(templates, ["first", "second"]);

        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn noop_accepts_everything() {
        let mut event = LogEvent::new(LogLevel::Fatal, "ignored");
        assert!(NoopSink.emit(&mut event).is_ok());
    }
}
