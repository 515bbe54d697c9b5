use crate::event::{ErrorInfo, LogEvent, LogLevel, PropertyValue};
use crate::sink::LogEventSink;
use chrono::Utc;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Property holding the `tracing` target an event was emitted from.
pub const SOURCE_CONTEXT_PROPERTY: &str = "SourceContext";

// Sinks in this crate self-log through `tracing`; those events must not
// re-enter the pipeline they came from.
const SELF_TARGET: &str = "couchbase_log_sink";

/// `tracing_subscriber` layer that turns `tracing` events into
/// [`LogEvent`]s and emits them into a [`LogEventSink`].
///
/// Emission is synchronous on the thread that logged. Sinks that talk to a
/// network should sit behind a batching stage rather than be called here
/// directly.
pub struct EventLayer<S> {
    sink: S,
    min_level: LogLevel,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events accepted by the sink.
    pub forwarded_events: Arc<AtomicU64>,
    /// Events the sink returned an error for.
    pub failed_events: Arc<AtomicU64>,
}

impl<S: LogEventSink> EventLayer<S> {
    pub fn new(sink: S, min_level: LogLevel) -> Self {
        EventLayer {
            sink,
            min_level,
            total_events: Arc::new(AtomicU64::new(0)),
            forwarded_events: Arc::new(AtomicU64::new(0)),
            failed_events: Arc::new(AtomicU64::new(0)),
        }
    }
}

pub fn level_from_tracing(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

impl<S, Sub> Layer<Sub> for EventLayer<S>
where
    S: LogEventSink + 'static,
    Sub: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, Sub>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        let level = level_from_tracing(meta.level());
        if level < self.min_level || meta.target().starts_with(SELF_TARGET) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut properties = visitor.properties;
        properties.insert(
            SOURCE_CONTEXT_PROPERTY.to_string(),
            PropertyValue::from(meta.target()),
        );

        let mut log_event = LogEvent {
            timestamp: Utc::now(),
            level,
            message_template: visitor.message.unwrap_or_default().into(),
            properties,
            exception: visitor.exception.map(Arc::new),
        };

        match self.sink.emit(&mut log_event) {
            Ok(()) => {
                self.forwarded_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.failed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log sink rejected event: {}", e);
            }
        }
    }
}

/// Collects the fields of a `tracing` event into event properties.
#[derive(Default)]
pub struct FieldVisitor {
    pub properties: BTreeMap<String, PropertyValue>,
    pub message: Option<String>,
    pub exception: Option<ErrorInfo>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: PropertyValue) {
        self.properties.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, PropertyValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, PropertyValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, PropertyValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, PropertyValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, PropertyValue::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        self.exception = Some(ErrorInfo::from_error(value));
        self.insert(field, PropertyValue::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, PropertyValue::from(format!("{:?}", value)));
        }
    }
}
