use crate::event::LogEvent;
use crate::sink::{LogEventSink, SinkError};

/// Sink decorator that hands the inner sink a private copy of each event.
///
/// Whatever the inner sink does to the copy (adding, replacing or removing
/// properties) is never observable through the original, and later changes
/// to the original never reach the copy. Timestamp, level, template and
/// exception are immutable and shared; the property mapping is deep-copied.
///
/// The decorator keeps no state besides the inner sink: no buffering, no
/// reordering, exactly one inner `emit` per outer `emit`.
#[derive(Debug, Clone, Default)]
pub struct CopyingSink<S> {
    inner: S,
}

impl<S> CopyingSink<S> {
    pub fn new(inner: S) -> Self {
        CopyingSink { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: LogEventSink> LogEventSink for CopyingSink<S> {
    /// Validate `event`, then forward a copy of it.
    ///
    /// Malformed events fail with [`SinkError::InvalidInput`] before the
    /// inner sink is called. Errors from the inner sink are returned as-is.
    fn emit(&self, event: &mut LogEvent) -> Result<(), SinkError> {
        event.validate()?;
        let mut copy = event.clone();
        self.inner.emit(&mut copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventError, LogLevel, PropertyValue, Structure, TYPE_TAG_KEY};
    use crate::memory_sink::CollectingSink;
    use std::sync::Arc;

    struct Failing;

    impl LogEventSink for Failing {
        fn emit(&self, _event: &mut LogEvent) -> Result<(), SinkError> {
            Err(SinkError::failed("backend down"))
        }
    }

    struct Mutating;

    impl LogEventSink for Mutating {
        fn emit(&self, event: &mut LogEvent) -> Result<(), SinkError> {
            event.add_or_update_property("Added", 1)?;
            event.remove_property("Kept");
            Ok(())
        }
    }

    #[test]
    fn original_is_untouched_by_inner_mutation() {
        let sink = CopyingSink::new(Mutating);
        let mut event = LogEvent::new(LogLevel::Info, "x")
            .with_property("Kept", "yes")
            .expect("valid event");
        let before = event.clone();

        sink.emit(&mut event).expect("emit");

        assert_eq!(event, before);
    }

    #[test]
    fn invalid_event_never_reaches_inner() {
        let probe = Arc::new(CollectingSink::new());
        let sink = CopyingSink::new(Arc::clone(&probe));

        let mut event = LogEvent::new(LogLevel::Info, "x");
        event.properties.insert(" ".to_string(), PropertyValue::from(1));

        match sink.emit(&mut event) {
            Err(SinkError::InvalidInput(EventError::InvalidPropertyName(name))) => {
                assert_eq!(name, " ")
            }
            other => panic!("expected invalid input, got {other:?}"),
        }
        assert!(probe.is_empty());
    }

    #[test]
    fn nested_type_tag_collision_is_invalid_input() {
        let probe = Arc::new(CollectingSink::new());
        let sink = CopyingSink::new(Arc::clone(&probe));

        let mut nested = Structure::new(Some("Order".to_string()));
        nested
            .properties
            .insert(TYPE_TAG_KEY.to_string(), PropertyValue::from("user data"));
        let mut event = LogEvent::new(LogLevel::Info, "x")
            .with_property("Order", nested)
            .expect("valid top-level name");

        assert!(matches!(
            sink.emit(&mut event),
            Err(SinkError::InvalidInput(EventError::ReservedFieldName(_)))
        ));
        assert!(probe.is_empty());
    }

    #[test]
    fn inner_failure_propagates_unchanged() {
        let sink = CopyingSink::new(Failing);
        let mut event = LogEvent::new(LogLevel::Warn, "x");

        match sink.emit(&mut event) {
            Err(SinkError::Failed(e)) => assert_eq!(e.to_string(), "backend down"),
            other => panic!("expected backend failure, got {other:?}"),
        }
    }
}
