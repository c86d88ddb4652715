//! # Instance Events
//!
//! Per-object publish/subscribe. Every component owns an [`EventTable`]
//! mapping event names to an ordered list of registrations. Triggering an
//! event walks that list in registration order and stops the moment a
//! handler marks the event as handled.
//!
//! Handlers are synchronous. A handler that needs to do asynchronous work
//! spawns it itself; `trigger` never waits for it.
//!
//! # Handler shapes
//!
//! [`HandlerSpec`] accepts every shape a configuration may use and
//! normalizes it into a [`Handler`], a `(callback, context)` pair:
//!
//! - a bare function,
//! - a function bound to a context object,
//! - a `(class, method)` pair resolved through [`register_static_handler`],
//! - an already normalized [`Handler`].

use crate::{
    component::Component,
    error::JiiError,
    value::{Config, Instance, Value},
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, LazyLock},
};

/// The callable part of a handler.
pub type Callback = Arc<dyn Fn(&mut Event<'_>) + Send + Sync>;

/// An event being delivered to handlers.
///
/// The same value travels through every handler of a trigger, so handlers
/// can communicate by mutating `params` or stop delivery via `handled`.
pub struct Event<'a> {
    /// The event name, set by `trigger`.
    pub name: String,
    /// The triggering component, defaulted by `trigger`.
    pub sender: Option<&'a dyn Component>,
    /// Set to `true` to stop delivery to the remaining handlers.
    pub handled: bool,
    /// Registration-time data of the handler currently running.
    pub data: Value,
    /// Trigger-time payload.
    pub params: Config,
    /// Context object the current handler was bound with.
    pub context: Option<Instance>,
}

impl<'a> Event<'a> {
    /// Create an empty event.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            sender: None,
            handled: false,
            data: Value::Null,
            params: Config::new(),
            context: None,
        }
    }

    /// Create an event carrying `params`.
    pub fn with_params(params: Config) -> Self {
        Self {
            params,
            ..Self::new()
        }
    }

    /// Create an event with an explicit sender.
    pub fn from_sender(sender: &'a dyn Component) -> Self {
        Self {
            sender: Some(sender),
            ..Self::new()
        }
    }

    /// Mark the event as handled.
    pub fn stop(&mut self) {
        self.handled = true;
    }

    /// Downcast the sender to a concrete type.
    pub fn sender_as<T: Component>(&self) -> Option<&'a T> {
        self.sender.and_then(|sender| sender.as_any().downcast_ref::<T>())
    }

    /// Downcast the bound context to a shared pointer of type `P`.
    pub fn context_as<P>(&self) -> Option<Arc<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        self.context.as_ref().and_then(Instance::get::<P>)
    }

    pub(crate) fn prepare(&mut self, name: &str, sender: &'a dyn Component) {
        self.handled = false;
        self.name = name.to_string();
        if self.sender.is_none() {
            self.sender = Some(sender);
        }
    }
}

impl Default for Event<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Config> for Event<'_> {
    fn from(params: Config) -> Self {
        Self::with_params(params)
    }
}

impl fmt::Debug for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("sender", &self.sender.map(|s| s.type_name()))
            .field("handled", &self.handled)
            .field("data", &self.data)
            .field("params", &self.params)
            .finish()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// A normalized handler: a callback and the context it is bound to.
#[derive(Clone)]
pub struct Handler {
    callback: Callback,
    context: Option<Instance>,
}

impl Handler {
    /// Create an unbound handler.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut Event<'_>) + Send + Sync + 'static,
    {
        Self::from_callback(Arc::new(callback))
    }

    /// Create an unbound handler from a shared callback.
    pub fn from_callback(callback: Callback) -> Self {
        Self {
            callback,
            context: None,
        }
    }

    /// Bind the handler to a context object.
    pub fn with_context(mut self, context: Instance) -> Self {
        self.context = Some(context);
        self
    }

    /// The bound context.
    pub fn context(&self) -> Option<&Instance> {
        self.context.as_ref()
    }

    /// Whether both handlers share the same callback and context.
    pub fn matches(&self, other: &Handler) -> bool {
        let same_context = match (&self.context, &other.context) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        };
        same_context && Arc::ptr_eq(&self.callback, &other.callback)
    }

    pub(crate) fn invoke(&self, event: &mut Event<'_>) {
        event.context = self.context.clone();
        (self.callback)(event);
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Any shape a handler may be given in.
#[derive(Clone)]
pub enum HandlerSpec {
    /// A bare function.
    Function(Callback),
    /// A function bound to a context object.
    Bound(Callback, Instance),
    /// A static handler registered under `(class, method)`.
    Method {
        /// Dotted class name.
        class: String,
        /// Method name.
        method: String,
    },
    /// An already normalized handler.
    Normalized(Handler),
}

impl HandlerSpec {
    /// A bare function handler.
    pub fn function<F>(callback: F) -> Self
    where
        F: Fn(&mut Event<'_>) + Send + Sync + 'static,
    {
        HandlerSpec::Function(Arc::new(callback))
    }

    /// A function bound to `context`.
    pub fn bound<F>(callback: F, context: Instance) -> Self
    where
        F: Fn(&mut Event<'_>) + Send + Sync + 'static,
    {
        HandlerSpec::Bound(Arc::new(callback), context)
    }

    /// A static `(class, method)` handler.
    pub fn method(class: impl Into<String>, method: impl Into<String>) -> Self {
        HandlerSpec::Method {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Normalize into a [`Handler`].
    ///
    /// Fails if a `(class, method)` pair has not been registered.
    pub fn normalize(&self) -> Result<Handler, JiiError> {
        match self {
            HandlerSpec::Function(callback) => Ok(Handler::from_callback(callback.clone())),
            HandlerSpec::Bound(callback, context) => {
                Ok(Handler::from_callback(callback.clone()).with_context(context.clone()))
            }
            HandlerSpec::Method { class, method } => static_handler(class, method)
                .map(Handler::from_callback)
                .ok_or_else(|| {
                    JiiError::application(format!("unknown handler method `{class}::{method}`"))
                }),
            HandlerSpec::Normalized(handler) => Ok(handler.clone()),
        }
    }

    /// Identity comparison, used by [`Value`] equality.
    pub fn same_as(&self, other: &HandlerSpec) -> bool {
        match (self.normalize(), other.normalize()) {
            (Ok(a), Ok(b)) => a.matches(&b),
            _ => false,
        }
    }
}

impl From<Handler> for HandlerSpec {
    fn from(handler: Handler) -> Self {
        HandlerSpec::Normalized(handler)
    }
}

impl TryFrom<Value> for HandlerSpec {
    type Error = JiiError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Handler(spec) => Ok(spec),
            Value::List(items) => match items.as_slice() {
                [Value::String(class), Value::String(method)] => {
                    Ok(HandlerSpec::method(class.clone(), method.clone()))
                }
                _ => Err(JiiError::application(
                    "a handler list must be a `[class, method]` pair of strings",
                )),
            },
            other => Err(JiiError::application(format!(
                "cannot build an event handler from a {} value",
                other.kind()
            ))),
        }
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSpec::Function(_) => f.write_str("Function(..)"),
            HandlerSpec::Bound(_, context) => f.debug_tuple("Bound").field(context).finish(),
            HandlerSpec::Method { class, method } => write!(f, "Method({class}::{method})"),
            HandlerSpec::Normalized(handler) => handler.fmt(f),
        }
    }
}

static STATIC_HANDLERS: LazyLock<RwLock<HashMap<(String, String), Callback>>> =
    LazyLock::new(Default::default);

/// Register a static handler reachable as `(class, method)`.
pub fn register_static_handler<F>(class: &str, method: &str, callback: F)
where
    F: Fn(&mut Event<'_>) + Send + Sync + 'static,
{
    STATIC_HANDLERS
        .write()
        .insert((class.to_string(), method.to_string()), Arc::new(callback));
}

fn static_handler(class: &str, method: &str) -> Option<Callback> {
    STATIC_HANDLERS
        .read()
        .get(&(class.to_string(), method.to_string()))
        .cloned()
}

/// Split `"a b,c"` into `["a", "b", "c"]`.
pub fn split_event_names(names: &str) -> impl Iterator<Item = &str> {
    names
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|name| !name.is_empty())
}

// ============================================================================
// Event table
// ============================================================================

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) handler: Handler,
    pub(crate) data: Value,
}

/// Ordered registrations grouped by event name.
#[derive(Default)]
pub(crate) struct HandlerMap(IndexMap<String, Vec<Registration>>);

impl HandlerMap {
    pub(crate) fn add(&mut self, name: &str, registration: Registration, prepend: bool) {
        let list = self.0.entry(name.to_string()).or_default();
        if prepend {
            list.insert(0, registration);
        } else {
            list.push(registration);
        }
    }

    pub(crate) fn remove(&mut self, name: &str, handler: Option<&Handler>) -> bool {
        match handler {
            None => self
                .0
                .shift_remove(name)
                .is_some_and(|list| !list.is_empty()),
            Some(handler) => {
                let Some(list) = self.0.get_mut(name) else {
                    return false;
                };
                let before = list.len();
                list.retain(|r| !r.handler.matches(handler));
                let removed = list.len() < before;
                if list.is_empty() {
                    self.0.shift_remove(name);
                }
                removed
            }
        }
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(|list| !list.is_empty())
    }

    pub(crate) fn snapshot(&self, name: &str) -> Vec<Registration> {
        self.0.get(name).cloned().unwrap_or_default()
    }
}

/// Deliver `event` to `registrations` in order.
///
/// Returns `true` if a handler marked the event handled.
pub(crate) fn deliver(registrations: &[Registration], event: &mut Event<'_>) -> bool {
    for registration in registrations {
        event.data = registration.data.clone();
        registration.handler.invoke(event);
        if event.handled {
            return true;
        }
    }
    false
}

/// The instance-level handler table owned by every component.
///
/// Registration and delivery are interior-mutable, so handlers may register
/// or remove handlers while an event is being delivered; such changes take
/// effect from the next trigger.
#[derive(Default)]
pub struct EventTable {
    handlers: RwLock<HandlerMap>,
}

impl EventTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every name in `names`.
    pub fn on(
        &self,
        names: &str,
        handler: &HandlerSpec,
        data: Value,
        prepend: bool,
    ) -> Result<(), JiiError> {
        let handler = handler.normalize()?;
        let mut map = self.handlers.write();
        for name in split_event_names(names) {
            let registration = Registration {
                handler: handler.clone(),
                data: data.clone(),
            };
            map.add(name, registration, prepend);
        }
        Ok(())
    }

    /// Remove handlers for every name in `names`.
    ///
    /// Without a handler every registration of the name is cleared. Returns
    /// whether anything was removed.
    pub fn off(&self, names: &str, handler: Option<&HandlerSpec>) -> Result<bool, JiiError> {
        let handler = handler.map(HandlerSpec::normalize).transpose()?;
        Ok(self.off_normalized(names, handler.as_ref()))
    }

    pub(crate) fn off_normalized(&self, names: &str, handler: Option<&Handler>) -> bool {
        let mut map = self.handlers.write();
        let mut removed = false;
        for name in split_event_names(names) {
            removed |= map.remove(name, handler);
        }
        removed
    }

    /// Whether any handler is registered for `name`.
    pub fn has_handlers(&self, name: &str) -> bool {
        self.handlers.read().has(name)
    }

    /// Deliver `event` to the handlers of `event.name`.
    ///
    /// Returns `true` if a handler marked the event handled.
    pub fn dispatch(&self, event: &mut Event<'_>) -> bool {
        let registrations = self.handlers.read().snapshot(&event.name);
        deliver(&registrations, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str) -> HandlerSpec {
        let log = log.clone();
        HandlerSpec::function(move |_event| log.lock().push(label.to_string()))
    }

    fn fire(table: &EventTable, name: &str) -> bool {
        let mut event = Event::new();
        event.name = name.to_string();
        table.dispatch(&mut event)
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let table = EventTable::new();
        table.on("save", &recorder(&log, "h1"), Value::Null, false).unwrap();
        table.on("save", &recorder(&log, "h2"), Value::Null, false).unwrap();
        table.on("save", &recorder(&log, "h0"), Value::Null, true).unwrap();

        assert!(!fire(&table, "save"));
        assert_eq!(*log.lock(), vec!["h0", "h1", "h2"]);
    }

    #[test]
    fn handled_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let table = EventTable::new();
        table.on("x", &recorder(&log, "h1"), Value::Null, false).unwrap();
        let stopper = {
            let log = log.clone();
            HandlerSpec::function(move |event| {
                log.lock().push("h2".into());
                event.stop();
            })
        };
        table.on("x", &stopper, Value::Null, false).unwrap();
        table.on("x", &recorder(&log, "h3"), Value::Null, false).unwrap();

        assert!(fire(&table, "x"));
        assert_eq!(*log.lock(), vec!["h1", "h2"]);
    }

    #[test]
    fn multi_names_register_each() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let table = EventTable::new();
        table.on("a b,c", &recorder(&log, "h"), Value::Null, false).unwrap();

        assert!(table.has_handlers("a"));
        assert!(table.has_handlers("b"));
        assert!(table.has_handlers("c"));
        assert!(!table.has_handlers("a b"));
    }

    #[test]
    fn off_matches_callback_and_context() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let table = EventTable::new();
        let keep = recorder(&log, "keep");
        let drop = recorder(&log, "drop");
        table.on("e", &keep, Value::Null, false).unwrap();
        table.on("e", &drop, Value::Null, false).unwrap();

        assert!(table.off("e", Some(&drop)).unwrap());
        assert!(!table.off("e", Some(&drop)).unwrap());
        fire(&table, "e");
        assert_eq!(*log.lock(), vec!["keep"]);

        assert!(table.off("e", None).unwrap());
        assert!(!table.off("e", None).unwrap());
        assert!(!table.has_handlers("e"));
    }

    #[test]
    fn data_is_per_registration() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let table = EventTable::new();
        let handler = {
            let seen = seen.clone();
            HandlerSpec::function(move |event| seen.lock().push(event.data.clone()))
        };
        table.on("e", &handler, Value::from(1), false).unwrap();
        table.on("e", &handler, Value::from("two"), false).unwrap();
        fire(&table, "e");

        assert_eq!(*seen.lock(), vec![Value::from(1), Value::from("two")]);
    }

    #[test]
    fn static_method_handlers_resolve_by_name() {
        let hits = Arc::new(Mutex::new(0));
        {
            let hits = hits.clone();
            register_static_handler("event.test.Audit", "onSave", move |_| *hits.lock() += 1);
        }
        let table = EventTable::new();
        let spec = HandlerSpec::try_from(Value::from(vec![
            Value::from("event.test.Audit"),
            Value::from("onSave"),
        ]))
        .unwrap();
        table.on("save", &spec, Value::Null, false).unwrap();
        fire(&table, "save");
        assert_eq!(*hits.lock(), 1);

        assert!(table.off("save", Some(&HandlerSpec::method("event.test.Audit", "onSave"))).unwrap());
    }

    #[test]
    fn unknown_shapes_are_rejected() {
        assert!(HandlerSpec::try_from(Value::from(3)).is_err());
        assert!(HandlerSpec::method("event.test.Missing", "nope").normalize().is_err());
    }

    #[test]
    fn handlers_may_mutate_the_table_during_delivery() {
        let table = Arc::new(EventTable::new());
        let inner = table.clone();
        let spec = HandlerSpec::function(move |_| {
            let _ = inner.off("e", None);
        });
        table.on("e", &spec, Value::Null, false).unwrap();
        fire(&table, "e");
        assert!(!table.has_handlers("e"));
    }
}
