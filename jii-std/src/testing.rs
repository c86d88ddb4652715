//! Testing utilities for Jii.
//!
//! This module provides utilities to make testing components, behaviors and
//! dispatch easier.
//!
//! # Features
//!
//! - [`EventLog`]: A shared, ordered log that hands out labelled handlers
//! - [`RecordingHandler`]: A handler that records every event it receives
//! - [`CountingBehavior`]: A behavior that counts the events it is bound to

use jii_core::{
    Behavior, BehaviorCore, Component, Config, Event, HandlerSpec, Identifiable, JiiError, Member,
    Object, PropertyError, TypeInfo, Value,
};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

// ============================================================================
// Event Log
// ============================================================================

/// An ordered log of labels, shared by the handlers it creates.
///
/// # Example
///
/// ```rust,ignore
/// let log = EventLog::new();
/// component.on("save", &log.handler("h1"))?;
/// component.on("save", &log.handler("h2"))?;
/// component.emit("save");
/// assert_eq!(log.entries(), ["h1", "h2"]);
/// ```
#[derive(Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler appending `label` to the log.
    pub fn handler(&self, label: &str) -> HandlerSpec {
        let entries = self.entries.clone();
        let label = label.to_string();
        HandlerSpec::function(move |_| entries.lock().push(label.clone()))
    }

    /// A handler appending `label` and then marking the event handled.
    pub fn stopping_handler(&self, label: &str) -> HandlerSpec {
        let entries = self.entries.clone();
        let label = label.to_string();
        HandlerSpec::function(move |event| {
            entries.lock().push(label.clone());
            event.stop();
        })
    }

    /// Append an entry directly.
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// A copy of the entries.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

// ============================================================================
// Recording Handler
// ============================================================================

/// One event observed by a [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    /// The event name.
    pub name: String,
    /// Type name of the sender.
    pub sender: Option<&'static str>,
    /// Registration data.
    pub data: Value,
    /// Trigger params.
    pub params: Config,
}

/// A handler that records every event it receives.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::new();
/// component.on("save", &recorder.spec())?;
/// component.emit("save");
/// assert_eq!(recorder.names(), ["save"]);
/// ```
#[derive(Clone, Default)]
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<Recorded>>>,
    stop: bool,
}

impl RecordingHandler {
    /// Create a recorder that lets events propagate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder that marks every event handled.
    pub fn stopping() -> Self {
        Self {
            stop: true,
            ..Self::default()
        }
    }

    /// The handler to register.
    pub fn spec(&self) -> HandlerSpec {
        let recorder = self.clone();
        HandlerSpec::function(move |event| recorder.record(event))
    }

    fn record(&self, event: &mut Event<'_>) {
        self.events.lock().push(Recorded {
            name: event.name.clone(),
            sender: event.sender.map(|s| s.type_name()),
            data: event.data.clone(),
            params: event.params.clone(),
        });
        if self.stop {
            event.stop();
        }
    }

    /// Get a clone of the recorded events.
    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().clone()
    }

    /// Names of the recorded events, in order.
    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.name.clone()).collect()
    }

    /// Get the number of recorded events.
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// Clear all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

// ============================================================================
// Counting Behavior
// ============================================================================

/// A behavior that counts the events it is bound to.
///
/// Configured through its `events` list. Exposes a proxied `count` method
/// returning the number of observed events.
#[derive(Default)]
pub struct CountingBehavior {
    core: BehaviorCore,
    events: Vec<String>,
    count: AtomicUsize,
}

impl CountingBehavior {
    /// Count `events`.
    pub fn new<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// How many events were observed.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Identifiable for CountingBehavior {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for CountingBehavior {
    const TYPE_NAME: &'static str = "jii.testing.CountingBehavior";
}

impl Object for CountingBehavior {
    fn member(&self, name: &str) -> Member {
        match name {
            "events" => Member::FIELD,
            "count" | "reset" => Member::METHOD,
            _ => Member::NONE,
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        if name != "events" {
            return Err(PropertyError::unknown(Self::TYPE_NAME, name).into());
        }
        self.events = value
            .as_list()
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        Ok(())
    }

    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        match name {
            "events" => Ok(Value::List(
                self.events.iter().map(|e| Value::from(e.as_str())).collect(),
            )),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }
}

impl Behavior for CountingBehavior {
    fn behavior(&self) -> &BehaviorCore {
        &self.core
    }

    fn events(&self) -> Vec<(String, String)> {
        self.events
            .iter()
            .map(|event| (event.clone(), "increment".to_string()))
            .collect()
    }

    fn handle(&self, method: &str, _event: &mut Event<'_>) -> bool {
        if method != "increment" {
            return false;
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn methods(&self) -> &'static [&'static str] {
        &["count", "reset"]
    }

    fn call(&self, method: &str, _owner: &dyn Component, _args: Vec<Value>) -> Result<Value, JiiError> {
        match method {
            "count" => Ok(Value::Int(self.count() as i64)),
            "reset" => Ok(Value::Int(self.count.swap(0, Ordering::SeqCst) as i64)),
            _ => Err(JiiError::application(format!(
                "behavior `{}` has no method `{method}`",
                Self::TYPE_NAME
            ))),
        }
    }
}
