use crate::event::{is_valid_property_name, EventError, LogEvent, PropertyValue};
use crate::sink::{LogEventSink, SinkError};

/// Adds a fixed set of properties to each event, then forwards it.
///
/// Properties already present on the event win; the enricher only fills
/// gaps. The event is modified in place, so everything downstream of the
/// caller sees the added properties too.
#[derive(Debug, Clone)]
pub struct EnrichingSink<S> {
    inner: S,
    properties: Vec<(String, PropertyValue)>,
}

impl<S> EnrichingSink<S> {
    pub fn new(inner: S) -> Self {
        EnrichingSink {
            inner,
            properties: Vec::new(),
        }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Result<Self, EventError> {
        let name = name.into();
        if !is_valid_property_name(&name) {
            return Err(EventError::InvalidPropertyName(name));
        }
        self.properties.push((name, value.into()));
        Ok(self)
    }
}

impl<S: LogEventSink> LogEventSink for EnrichingSink<S> {
    fn emit(&self, event: &mut LogEvent) -> Result<(), SinkError> {
        for (name, value) in &self.properties {
            event.add_property_if_absent(name.as_str(), value.clone())?;
        }
        self.inner.emit(event)
    }
}
