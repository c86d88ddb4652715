//! # Class-Level Events
//!
//! Handlers registered against a type name instead of an instance. When a
//! component triggers an event, the handlers of its own type run first,
//! then those of each ancestor in turn, so a subscription on a base type
//! observes every derived type.

use crate::{
    component::Component,
    error::JiiError,
    event::{Event, HandlerMap, HandlerSpec, Registration, deliver, split_event_names},
    identity::{ancestors, ensure_lineage},
    value::Value,
};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::LazyLock};

static CLASS_HANDLERS: LazyLock<RwLock<HashMap<String, HandlerMap>>> =
    LazyLock::new(Default::default);

/// The process-wide class-level event registry.
pub struct ClassEvents;

impl ClassEvents {
    /// Register `handler` for `names` on `type_name`.
    pub fn on(
        type_name: &str,
        names: &str,
        handler: &HandlerSpec,
        data: Value,
        prepend: bool,
    ) -> Result<(), JiiError> {
        let handler = handler.normalize()?;
        let mut registry = CLASS_HANDLERS.write();
        let map = registry.entry(type_name.to_string()).or_default();
        for name in split_event_names(names) {
            let registration = Registration {
                handler: handler.clone(),
                data: data.clone(),
            };
            map.add(name, registration, prepend);
        }
        Ok(())
    }

    /// Remove class-level handlers of `type_name`.
    ///
    /// Without a handler every registration of each name is removed.
    pub fn off(
        type_name: &str,
        names: &str,
        handler: Option<&HandlerSpec>,
    ) -> Result<bool, JiiError> {
        let handler = handler.map(HandlerSpec::normalize).transpose()?;
        let mut registry = CLASS_HANDLERS.write();
        let Some(map) = registry.get_mut(type_name) else {
            return Ok(false);
        };
        let mut removed = false;
        for name in split_event_names(names) {
            removed |= map.remove(name, handler.as_ref());
        }
        Ok(removed)
    }

    /// Remove every class-level handler of `type_name`.
    pub fn off_all(type_name: &str) -> bool {
        CLASS_HANDLERS.write().remove(type_name).is_some()
    }

    /// Remove every class-level handler of every type.
    pub fn clear() {
        CLASS_HANDLERS.write().clear();
    }

    /// Whether `type_name` or any of its ancestors has a handler for `name`.
    pub fn has_handlers(type_name: &str, name: &str) -> bool {
        let registry = CLASS_HANDLERS.read();
        ancestors(type_name)
            .iter()
            .any(|ty| registry.get(ty).is_some_and(|map| map.has(name)))
    }

    /// Deliver `event` to the class-level handlers of `sender`'s type chain.
    ///
    /// Returns `true` if a handler marked the event handled.
    pub fn trigger(sender: &dyn Component, name: &str, event: &mut Event<'_>) -> bool {
        ensure_lineage(sender.type_name(), sender.parent_type_name());
        Self::trigger_type(sender.type_name(), name, event)
    }

    /// Deliver `event` to the class-level handlers of `type_name` and its ancestors.
    pub fn trigger_type(type_name: &str, name: &str, event: &mut Event<'_>) -> bool {
        event.name = name.to_string();
        for ty in ancestors(type_name) {
            let registrations = CLASS_HANDLERS
                .read()
                .get(&ty)
                .map(|map| map.snapshot(name))
                .unwrap_or_default();
            if registrations.is_empty() {
                continue;
            }
            tracing::trace!(event = name, class = %ty, "class-level handlers");
            if deliver(&registrations, event) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::register_lineage;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, label: &'static str, stop: bool) -> HandlerSpec {
        let log = log.clone();
        HandlerSpec::function(move |event| {
            log.lock().push(label.to_string());
            if stop {
                event.stop();
            }
        })
    }

    #[test]
    fn base_handlers_observe_derived_types() {
        register_lineage("class.test.Base", None);
        register_lineage("class.test.Derived", Some("class.test.Base"));

        let log = Arc::new(Mutex::new(Vec::new()));
        ClassEvents::on("class.test.Base", "x", &recorder(&log, "base", false), Value::Null, false)
            .unwrap();
        ClassEvents::on("class.test.Derived", "x", &recorder(&log, "derived", false), Value::Null, false)
            .unwrap();

        assert!(ClassEvents::has_handlers("class.test.Derived", "x"));
        assert!(!ClassEvents::has_handlers("class.test.Derived", "y"));

        let mut event = Event::new();
        assert!(!ClassEvents::trigger_type("class.test.Derived", "x", &mut event));
        assert_eq!(*log.lock(), vec!["derived", "base"]);
    }

    #[test]
    fn handled_stops_the_ancestor_walk() {
        register_lineage("class.test.StopBase", None);
        register_lineage("class.test.StopLeaf", Some("class.test.StopBase"));

        let log = Arc::new(Mutex::new(Vec::new()));
        ClassEvents::on("class.test.StopBase", "x", &recorder(&log, "base", false), Value::Null, false)
            .unwrap();
        ClassEvents::on("class.test.StopLeaf", "x", &recorder(&log, "leaf", true), Value::Null, false)
            .unwrap();

        let mut event = Event::new();
        assert!(ClassEvents::trigger_type("class.test.StopLeaf", "x", &mut event));
        assert_eq!(*log.lock(), vec!["leaf"]);
    }

    #[test]
    fn off_and_off_all() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = recorder(&log, "h", false);
        ClassEvents::on("class.test.Off", "a b", &handler, Value::Null, false).unwrap();

        assert!(ClassEvents::off("class.test.Off", "a", Some(&handler)).unwrap());
        assert!(!ClassEvents::has_handlers("class.test.Off", "a"));
        assert!(ClassEvents::has_handlers("class.test.Off", "b"));
        assert!(!ClassEvents::off("class.test.Unknown", "a", None).unwrap());

        assert!(ClassEvents::off_all("class.test.Off"));
        assert!(!ClassEvents::has_handlers("class.test.Off", "b"));
    }
}
