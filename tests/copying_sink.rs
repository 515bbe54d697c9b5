use std::sync::{Arc, Mutex};
use std::thread;

use couchbase_log_sink::copying::CopyingSink;
use couchbase_log_sink::event::{EventError, LogEvent, LogLevel, PropertyValue, Structure};
use couchbase_log_sink::sink::{LogEventSink, SinkError};

/// Records every event it receives, then applies `mutate` to it so tests can
/// check what leaks back.
struct Recorder<F> {
    seen: Mutex<Vec<LogEvent>>,
    /// Address of each event received, for identity checks only.
    addresses: Mutex<Vec<usize>>,
    mutate: F,
}

impl<F> Recorder<F>
where
    F: Fn(&mut LogEvent) + Send + Sync,
{
    fn new(mutate: F) -> Self {
        Recorder {
            seen: Mutex::new(Vec::new()),
            addresses: Mutex::new(Vec::new()),
            mutate,
        }
    }

    fn seen(&self) -> Vec<LogEvent> {
        self.seen.lock().expect("recorder lock").clone()
    }

    fn addresses(&self) -> Vec<usize> {
        self.addresses.lock().expect("recorder lock").clone()
    }
}

impl<F> LogEventSink for Recorder<F>
where
    F: Fn(&mut LogEvent) + Send + Sync,
{
    fn emit(&self, event: &mut LogEvent) -> Result<(), SinkError> {
        self.addresses
            .lock()
            .expect("recorder lock")
            .push(event as *const LogEvent as usize);
        (self.mutate)(event);
        self.seen.lock().expect("recorder lock").push(event.clone());
        Ok(())
    }
}

fn add_p1(event: &mut LogEvent) {
    event
        .add_or_update_property("P1", "set by inner sink")
        .expect("valid name");
}

#[test]
fn properties_added_downstream_do_not_reach_the_original() {
    let recorder = Arc::new(Recorder::new(add_p1));
    let sink = CopyingSink::new(Arc::clone(&recorder));

    let mut original = LogEvent::new(LogLevel::Info, "test");
    sink.emit(&mut original).expect("emit");

    let seen = recorder.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains_property("P1"));
    assert!(!original.contains_property("P1"));

    let received = recorder.addresses();
    assert_eq!(received.len(), 1);
    assert!(!std::ptr::eq(received[0] as *const LogEvent, &original));
    assert!(original.properties.is_empty());
}

#[test]
fn copy_matches_the_original_at_emit_time() {
    let recorder = Arc::new(Recorder::new(|_: &mut LogEvent| {}));
    let sink = CopyingSink::new(Arc::clone(&recorder));

    let nested = Structure::new(Some("Request".to_string()))
        .with_field("Path", "/orders")
        .expect("valid field");
    let mut original = LogEvent::new(LogLevel::Warn, "slow {Request}")
        .with_property("Request", nested)
        .and_then(|e| e.with_property("Tags", vec!["a", "b"]))
        .expect("valid event");

    sink.emit(&mut original).expect("emit");
    original
        .add_or_update_property("Late", 1)
        .expect("valid name");

    let seen = &recorder.seen()[0];
    assert_eq!(seen.timestamp, original.timestamp);
    assert_eq!(seen.level, original.level);
    assert_eq!(seen.message_template, original.message_template);
    assert_eq!(seen.properties.len(), 2);
    assert_eq!(seen.property("Request"), original.property("Request"));
    assert_eq!(seen.property("Tags"), original.property("Tags"));
    assert!(!seen.contains_property("Late"));
}

#[test]
fn replacing_and_removing_downstream_leave_the_original_intact() {
    let recorder = Arc::new(Recorder::new(|e: &mut LogEvent| {
        e.add_or_update_property("Keep", "replaced").expect("valid name");
        e.remove_property("Drop");
        if let Some(PropertyValue::Structure(s)) = e.properties.get_mut("Nested") {
            s.properties.clear();
        }
    }));
    let sink = CopyingSink::new(Arc::clone(&recorder));

    let nested = Structure::new(None).with_field("Inner", 5).expect("valid field");
    let mut original = LogEvent::new(LogLevel::Info, "x")
        .with_property("Keep", "original")
        .and_then(|e| e.with_property("Drop", true))
        .and_then(|e| e.with_property("Nested", nested.clone()))
        .expect("valid event");
    let before = original.clone();

    sink.emit(&mut original).expect("emit");

    assert_eq!(original, before);
    assert_eq!(original.property("Nested"), Some(&PropertyValue::from(nested)));
    assert_eq!(
        recorder.seen()[0].property("Keep"),
        Some(&PropertyValue::from("replaced"))
    );
}

#[test]
fn one_inner_call_per_outer_call() {
    let recorder = Arc::new(Recorder::new(|_: &mut LogEvent| {}));
    let sink = CopyingSink::new(Arc::clone(&recorder));

    for i in 0..5 {
        let mut event = LogEvent::new(LogLevel::Debug, "tick {I}")
            .with_property("I", i)
            .expect("valid event");
        sink.emit(&mut event).expect("emit");
    }

    let order: Vec<String> = recorder.seen().iter().map(|e| e.render_message()).collect();
    assert_eq!(order, ["tick 0", "tick 1", "tick 2", "tick 3", "tick 4"]);
}

#[test]
fn malformed_event_is_rejected_before_the_inner_sink() {
    let recorder = Arc::new(Recorder::new(add_p1));
    let sink = CopyingSink::new(Arc::clone(&recorder));

    let mut event = LogEvent::new(LogLevel::Error, "x");
    event
        .properties
        .insert(String::new(), PropertyValue::from("no name"));
    let before = event.clone();

    let err = sink.emit(&mut event).expect_err("blank name must be rejected");
    assert!(matches!(
        err,
        SinkError::InvalidInput(EventError::InvalidPropertyName(_))
    ));
    assert!(recorder.seen().is_empty());
    assert_eq!(event, before);
}

#[test]
fn concurrent_callers_each_see_only_their_own_copy() {
    const CALLERS: usize = 8;
    const PER_CALLER: usize = 50;

    let recorder = Arc::new(Recorder::new(add_p1));
    let sink = CopyingSink::new(Arc::clone(&recorder));

    thread::scope(|scope| {
        for caller in 0..CALLERS {
            let sink = &sink;
            scope.spawn(move || {
                for n in 0..PER_CALLER {
                    let mut event = LogEvent::new(LogLevel::Info, "caller {Caller} #{N}")
                        .with_property("Caller", caller as u64)
                        .and_then(|e| e.with_property("N", n as u64))
                        .expect("valid event");
                    sink.emit(&mut event).expect("emit");

                    assert!(!event.contains_property("P1"));
                    assert_eq!(event.properties.len(), 2);
                }
            });
        }
    });

    let seen = recorder.seen();
    assert_eq!(seen.len(), CALLERS * PER_CALLER);

    let mut per_caller = vec![Vec::new(); CALLERS];
    for event in &seen {
        assert_eq!(event.properties.len(), 3);
        let caller = match event.property("Caller") {
            Some(PropertyValue::Scalar(v)) => v.to_string().parse::<usize>().expect("caller id"),
            other => panic!("missing caller property: {other:?}"),
        };
        per_caller[caller].push(event.render_message());
    }
    for (caller, messages) in per_caller.iter().enumerate() {
        assert_eq!(messages.len(), PER_CALLER);
        assert!(messages
            .iter()
            .all(|m| m.starts_with(&format!("caller {caller} #"))));
    }
}
