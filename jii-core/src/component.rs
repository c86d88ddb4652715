//! # Components
//!
//! [`Component`] is the base live object: it combines dynamic property
//! access ([`Object`]), instance-level events forwarded to the class level,
//! and behaviors whose methods are proxied onto the component.
//!
//! A type becomes a component by embedding a [`ComponentCore`] and returning
//! it from [`Component::component`]. Everything else is provided.
//!
//! ```rust,ignore
//! #[derive(Default, Identifiable)]
//! #[jii(name = "app.models.Post")]
//! struct Post {
//!     core: ComponentCore,
//! }
//!
//! impl Object for Post {}
//!
//! impl Component for Post {
//!     fn component(&self) -> &ComponentCore {
//!         &self.core
//!     }
//! }
//! ```
//!
//! Two key prefixes are reserved by [`Component::set`]: `"on <event>"`
//! registers a handler and `"as <name>"` attaches a behavior.

use crate::{
    behavior::{self, Behavior, BehaviorSpec, is_proxyable},
    class_event::ClassEvents,
    error::{JiiError, PropertyError},
    event::{Event, EventTable, HandlerSpec},
    identity::ensure_lineage,
    object::{Object, assign_field, check_ambiguity},
    value::{CLASS_NAME_KEY, Config, Value},
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

/// Key prefix binding an event handler through [`Component::set`].
pub const EVENT_PREFIX: &str = "on ";
/// Key prefix attaching a behavior through [`Component::set`].
pub const BEHAVIOR_PREFIX: &str = "as ";

/// State shared by every component.
#[derive(Default)]
pub struct ComponentCore {
    events: Arc<EventTable>,
    behaviors: RwLock<IndexMap<String, Arc<dyn Behavior>>>,
    proxies: RwLock<HashMap<String, String>>,
    ensured: AtomicBool,
    owner: RwLock<Option<Weak<dyn Component>>>,
}

impl ComponentCore {
    /// Create an empty core.
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance-level handler table.
    pub fn events(&self) -> &Arc<EventTable> {
        &self.events
    }

    /// Set the owning object.
    pub fn set_owner(&self, owner: Weak<dyn Component>) {
        *self.owner.write() = Some(owner);
    }

    /// The owning object, if it is still alive.
    pub fn owner(&self) -> Option<Arc<dyn Component>> {
        self.owner.read().as_ref().and_then(Weak::upgrade)
    }
}

impl fmt::Debug for ComponentCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCore")
            .field("behaviors", &self.behaviors.read().keys().collect::<Vec<_>>())
            .field("ensured", &self.ensured.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Upcast to `&dyn Component`, implemented for every sized component.
pub trait AsComponent {
    /// View as a component trait object.
    fn as_component(&self) -> &dyn Component;
}

impl<T: Component> AsComponent for T {
    fn as_component(&self) -> &dyn Component {
        self
    }
}

/// The base live object.
pub trait Component: Object + AsComponent {
    /// The embedded component state.
    fn component(&self) -> &ComponentCore;

    /// Behaviors attached on first need, in declaration order.
    fn behaviors(&self) -> Vec<(String, BehaviorSpec)> {
        Vec::new()
    }

    /// The owning object, if any.
    fn owner(&self) -> Option<Arc<dyn Component>> {
        self.component().owner()
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Register `handler` for the space/comma separated `names`.
    fn on(&self, names: &str, handler: &HandlerSpec) -> Result<(), JiiError> {
        self.on_with(names, handler, Value::Null, false)
    }

    /// Register `handler` with registration data, optionally in front.
    fn on_with(
        &self,
        names: &str,
        handler: &HandlerSpec,
        data: Value,
        prepend: bool,
    ) -> Result<(), JiiError> {
        self.ensure_behaviors()?;
        self.component().events.on(names, handler, data, prepend)
    }

    /// Remove `handler`, or every handler when `None`, from `names`.
    fn off(&self, names: &str, handler: Option<&HandlerSpec>) -> Result<bool, JiiError> {
        self.ensure_behaviors()?;
        self.component().events.off(names, handler)
    }

    /// Whether the instance or its type chain has a handler for `name`.
    fn has_event_handlers(&self, name: &str) -> bool {
        if let Err(err) = self.ensure_behaviors() {
            tracing::warn!(component = self.type_name(), error = %err, "failed to attach behaviors");
        }
        ensure_lineage(self.type_name(), self.parent_type_name());
        self.component().events.has_handlers(name)
            || ClassEvents::has_handlers(self.type_name(), name)
    }

    /// Trigger `name` with an explicit event object.
    ///
    /// Instance handlers run first. Unless one of them handled the event,
    /// class-level handlers of the type chain run next. Returns whether the
    /// event was handled.
    fn trigger<'a>(&'a self, name: &str, event: &mut Event<'a>) -> bool {
        if let Err(err) = self.ensure_behaviors() {
            tracing::warn!(component = self.type_name(), error = %err, "failed to attach behaviors");
        }
        event.prepare(name, self.as_component());
        tracing::trace!(event = name, sender = self.type_name(), "trigger");
        if self.component().events.dispatch(event) {
            return true;
        }
        ClassEvents::trigger(self.as_component(), name, event)
    }

    /// Trigger `name` with a fresh event.
    fn emit(&self, name: &str) -> bool {
        self.trigger(name, &mut Event::new())
    }

    /// Trigger `name` with a fresh event carrying `params`.
    fn emit_with(&self, name: &str, params: Config) -> bool {
        self.trigger(name, &mut Event::with_params(params))
    }

    // ------------------------------------------------------------------
    // Behaviors
    // ------------------------------------------------------------------

    /// Attach the declared behaviors, once.
    fn ensure_behaviors(&self) -> Result<(), JiiError> {
        if self.component().ensured.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for (name, spec) in self.behaviors() {
            attach_named(self.as_component(), &name, spec)?;
        }
        Ok(())
    }

    /// Attach a behavior under `name`, replacing any previous occupant.
    fn attach_behavior(&self, name: &str, spec: BehaviorSpec) -> Result<Arc<dyn Behavior>, JiiError> {
        self.ensure_behaviors()?;
        attach_named(self.as_component(), name, spec)
    }

    /// Attach several behaviors in order.
    fn attach_behaviors(&self, specs: Vec<(String, BehaviorSpec)>) -> Result<(), JiiError> {
        self.ensure_behaviors()?;
        for (name, spec) in specs {
            attach_named(self.as_component(), &name, spec)?;
        }
        Ok(())
    }

    /// Detach the behavior named `name`.
    ///
    /// Its proxied methods stay registered; calling them afterwards fails.
    /// A behavior that has since moved to another owner keeps its bindings
    /// there.
    fn detach_behavior(&self, name: &str) -> Option<Arc<dyn Behavior>> {
        if let Err(err) = self.ensure_behaviors() {
            tracing::warn!(component = self.type_name(), error = %err, "failed to attach behaviors");
        }
        let removed = self.component().behaviors.write().shift_remove(name)?;
        behavior::detach_from(removed.as_ref(), self.as_component());
        Some(removed)
    }

    /// Detach every behavior.
    fn detach_behaviors(&self) {
        if let Err(err) = self.ensure_behaviors() {
            tracing::warn!(component = self.type_name(), error = %err, "failed to attach behaviors");
        }
        let removed: Vec<_> = self.component().behaviors.write().drain(..).collect();
        for (_, behavior) in removed {
            behavior::detach_from(behavior.as_ref(), self.as_component());
        }
    }

    /// The behavior attached under `name`.
    fn get_behavior(&self, name: &str) -> Option<Arc<dyn Behavior>> {
        if let Err(err) = self.ensure_behaviors() {
            tracing::warn!(component = self.type_name(), error = %err, "failed to attach behaviors");
        }
        self.component().behaviors.read().get(name).cloned()
    }

    /// Every attached behavior, in attachment order.
    fn get_behaviors(&self) -> Vec<(String, Arc<dyn Behavior>)> {
        if let Err(err) = self.ensure_behaviors() {
            tracing::warn!(component = self.type_name(), error = %err, "failed to attach behaviors");
        }
        self.component()
            .behaviors
            .read()
            .iter()
            .map(|(name, behavior)| (name.clone(), behavior.clone()))
            .collect()
    }

    /// The behavior attached under `name`, downcast to `T`.
    fn behavior_as<T: Behavior>(&self, name: &str) -> Option<Arc<T>>
    where
        Self: Sized,
    {
        self.get_behavior(name)?.into_any_arc().downcast::<T>().ok()
    }

    /// Whether `name` is a method of the component or a proxied behavior method.
    fn has_method(&self, name: &str) -> bool {
        if self.member(name).method {
            return true;
        }
        if let Err(err) = self.ensure_behaviors() {
            tracing::warn!(component = self.type_name(), error = %err, "failed to attach behaviors");
        }
        self.component().proxies.read().contains_key(name)
    }

    /// Call a proxied behavior method.
    ///
    /// The behavior is looked up by name at call time, so a replacement
    /// attached under the same name is observed.
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, JiiError> {
        self.ensure_behaviors()?;
        let core = self.component();
        let Some(name) = core.proxies.read().get(method).cloned() else {
            return Err(JiiError::application(format!(
                "calling unknown method: {}::{method}()",
                self.type_name()
            )));
        };
        let behavior = core.behaviors.read().get(&name).cloned();
        match behavior {
            Some(behavior) => behavior.call(method, self.as_component(), args),
            None => {
                tracing::warn!(
                    component = self.type_name(),
                    method,
                    behavior = %name,
                    "stale behavior method"
                );
                Err(JiiError::application(format!(
                    "method `{method}` of detached behavior `{name}` called on {}",
                    self.type_name()
                )))
            }
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Set a property, bind an `on …` handler or attach an `as …` behavior.
    fn set(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        let member = self.member(name);
        check_ambiguity(self.type_name(), name, member)?;

        if member.setter {
            return self.set_member(name, value);
        }
        if member.field {
            return assign_field(self, name, value);
        }
        if let Some(event) = name.strip_prefix(EVENT_PREFIX) {
            let handler = HandlerSpec::try_from(value)?;
            return self.on(event.trim(), &handler);
        }
        if let Some(behavior) = name.strip_prefix(BEHAVIOR_PREFIX) {
            let spec = BehaviorSpec::try_from(value)?;
            return self.attach_behavior(behavior.trim(), spec).map(|_| ());
        }
        if member.getter {
            return Err(PropertyError::ReadOnly {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            }
            .into());
        }
        Err(PropertyError::unknown(self.type_name(), name).into())
    }

    /// Apply every entry of `config` through [`set`](Self::set).
    fn set_all(&mut self, config: Config) -> Result<(), JiiError> {
        for (key, value) in config {
            if key == CLASS_NAME_KEY {
                continue;
            }
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// Read a property.
    fn get(&self, name: &str) -> Result<Value, JiiError> {
        let member = self.member(name);
        if member.readable() {
            return self.get_member(name);
        }
        if member.setter {
            return Err(PropertyError::WriteOnly {
                type_name: self.type_name().to_string(),
                property: name.to_string(),
            }
            .into());
        }
        Err(PropertyError::unknown(self.type_name(), name).into())
    }

    /// Whether `name` can be written.
    fn can_set_property(&self, name: &str) -> bool {
        self.member(name).writable()
    }

    /// Whether `name` can be read.
    fn can_get_property(&self, name: &str) -> bool {
        self.member(name).readable()
    }

    /// Whether `name` can be read or written.
    fn has_property(&self, name: &str) -> bool {
        let member = self.member(name);
        member.readable() || member.writable()
    }
}

impl dyn Component {
    /// The behavior attached under `name`, downcast to `T`.
    pub fn behavior_as<T: Behavior>(&self, name: &str) -> Option<Arc<T>> {
        self.get_behavior(name)?.into_any_arc().downcast::<T>().ok()
    }

    /// Downcast to a concrete component type.
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.type_name())
    }
}

fn attach_named(
    owner: &dyn Component,
    name: &str,
    spec: BehaviorSpec,
) -> Result<Arc<dyn Behavior>, JiiError> {
    let behavior = spec.materialize()?;
    let core = owner.component();

    let previous = core.behaviors.write().shift_remove(name);
    if let Some(previous) = previous {
        behavior::detach_from(previous.as_ref(), owner);
    }

    behavior::attach(&behavior, owner)?;
    core.behaviors
        .write()
        .insert(name.to_string(), behavior.clone());

    let mut proxies = core.proxies.write();
    for method in behavior.methods().iter().copied().filter(|m| is_proxyable(m)) {
        proxies.insert(method.to_string(), name.to_string());
    }
    drop(proxies);

    tracing::trace!(
        component = owner.type_name(),
        behavior = name,
        class = behavior.type_name(),
        "behavior bound"
    );
    Ok(behavior)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        behavior::BehaviorCore,
        error::ConfigError,
        identity::{Identifiable, TypeInfo, register_lineage},
        object::Member,
    };
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Post {
        core: ComponentCore,
        title: String,
        slug: String,
        views: i64,
    }

    impl Identifiable for Post {
        fn type_name(&self) -> &'static str {
            Self::TYPE_NAME
        }
        fn parent_type_name(&self) -> Option<&'static str> {
            Self::PARENT_TYPE_NAME
        }
    }

    impl TypeInfo for Post {
        const TYPE_NAME: &'static str = "component.test.Post";
        const PARENT_TYPE_NAME: Option<&'static str> = Some("component.test.Record");
    }

    impl Object for Post {
        fn member(&self, name: &str) -> Member {
            match name {
                "title" => Member::FIELD,
                "slug" => Member::ACCESSOR,
                "views" => Member::READ_ONLY,
                "publish" => Member::METHOD,
                _ => Member::NONE,
            }
        }

        fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
            let text = value
                .as_str()
                .ok_or_else(|| PropertyError::invalid(Self::TYPE_NAME, name, "string"))?
                .to_string();
            match name {
                "title" => self.title = text,
                "slug" => self.slug = text.to_lowercase(),
                _ => return Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
            }
            Ok(())
        }

        fn get_member(&self, name: &str) -> Result<Value, JiiError> {
            match name {
                "title" => Ok(self.title.clone().into()),
                "slug" => Ok(self.slug.clone().into()),
                "views" => Ok(self.views.into()),
                _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
            }
        }
    }

    impl Component for Post {
        fn component(&self) -> &ComponentCore {
            &self.core
        }
    }

    #[derive(Default)]
    struct Counter {
        core: BehaviorCore,
        saves: AtomicUsize,
        label: &'static str,
    }

    impl Identifiable for Counter {
        fn type_name(&self) -> &'static str {
            "component.test.Counter"
        }
    }

    impl Object for Counter {}

    impl Behavior for Counter {
        fn behavior(&self) -> &BehaviorCore {
            &self.core
        }

        fn events(&self) -> Vec<(String, String)> {
            vec![("save".into(), "onSave".into())]
        }

        fn handle(&self, method: &str, _event: &mut Event<'_>) -> bool {
            if method == "onSave" {
                self.saves.fetch_add(1, Ordering::SeqCst);
                return true;
            }
            false
        }

        fn methods(&self) -> &'static [&'static str] {
            &["count", "_internal", "attach"]
        }

        fn call(&self, method: &str, owner: &dyn Component, _args: Vec<Value>) -> Result<Value, JiiError> {
            match method {
                "count" => Ok(format!(
                    "{}:{}:{}",
                    self.label,
                    owner.type_name(),
                    self.saves.load(Ordering::SeqCst)
                )
                .into()),
                _ => Err(JiiError::application("no such method")),
            }
        }
    }

    fn counter(label: &'static str) -> Arc<Counter> {
        Arc::new(Counter {
            label,
            ..Default::default()
        })
    }

    #[test]
    fn set_and_get_follow_accessors() {
        let mut post = Post::default();
        post.set("title", "Hello".into()).unwrap();
        post.set("slug", "HeLLo".into()).unwrap();
        assert_eq!(post.get("title").unwrap(), Value::from("Hello"));
        assert_eq!(post.get("slug").unwrap(), Value::from("hello"));

        assert!(matches!(
            post.set("views", 3.into()),
            Err(JiiError::Property(PropertyError::ReadOnly { .. }))
        ));
        assert!(matches!(
            post.get("color"),
            Err(JiiError::Property(PropertyError::Unknown { .. }))
        ));
        assert!(post.can_get_property("views"));
        assert!(!post.can_set_property("views"));
        assert!(post.has_property("slug"));
        assert!(!post.has_property("publish"));
    }

    #[test]
    fn event_handlers_bind_through_set() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = {
            let hits = hits.clone();
            HandlerSpec::function(move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };
        let mut post = Post::default();
        post.set("on publish", handler.into()).unwrap();
        post.emit("publish");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sender_defaults_to_the_triggering_component() {
        let seen = Arc::new(Mutex::new(None));
        let post = Post {
            title: "t".into(),
            ..Default::default()
        };
        {
            let seen = seen.clone();
            post.on(
                "view",
                &HandlerSpec::function(move |event| {
                    *seen.lock() = event.sender_as::<Post>().map(|p| p.title.clone());
                }),
            )
            .unwrap();
        }
        post.emit("view");
        assert_eq!(seen.lock().as_deref(), Some("t"));
    }

    #[test]
    fn instance_handled_skips_class_level() {
        register_lineage(Post::TYPE_NAME, Post::PARENT_TYPE_NAME);
        let class_hits = Arc::new(AtomicUsize::new(0));
        {
            let class_hits = class_hits.clone();
            ClassEvents::on(
                "component.test.Record",
                "archive unarchive",
                &HandlerSpec::function(move |_| {
                    class_hits.fetch_add(1, Ordering::SeqCst);
                }),
                Value::Null,
                false,
            )
            .unwrap();
        }

        let post = Post::default();
        assert!(post.has_event_handlers("archive"));
        post.on("archive", &HandlerSpec::function(|event| event.stop()))
            .unwrap();

        assert!(post.emit("archive"));
        assert!(!post.emit("unarchive"));
        assert_eq!(class_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn behavior_events_and_proxies() {
        let post = Post::default();
        let first = counter("first");
        post.attach_behavior("counter", BehaviorSpec::Instance(first.clone()))
            .unwrap();

        post.emit("save");
        assert_eq!(first.saves.load(Ordering::SeqCst), 1);
        assert_eq!(
            post.call("count", vec![]).unwrap(),
            Value::from("first:component.test.Post:1")
        );
        assert!(post.has_method("count"));
        assert!(post.has_method("publish"));
        assert!(!post.has_method("_internal"));
        assert!(!post.has_method("attach"));

        let typed = post.behavior_as::<Counter>("counter").unwrap();
        assert!(Arc::ptr_eq(&typed, &first));
    }

    #[test]
    fn proxies_resolve_the_current_behavior() {
        let post = Post::default();
        let first = counter("first");
        post.attach_behavior("counter", BehaviorSpec::Instance(first.clone()))
            .unwrap();
        post.attach_behavior("counter", BehaviorSpec::Instance(counter("second")))
            .unwrap();

        assert!(!first.behavior().is_attached());
        post.emit("save");
        assert_eq!(first.saves.load(Ordering::SeqCst), 0);
        assert_eq!(
            post.call("count", vec![]).unwrap(),
            Value::from("second:component.test.Post:1")
        );
    }

    #[test]
    fn detached_behavior_leaves_stale_proxy() {
        let post = Post::default();
        let first = counter("first");
        post.attach_behavior("counter", BehaviorSpec::Instance(first.clone()))
            .unwrap();
        assert!(post.detach_behavior("counter").is_some());
        assert!(post.detach_behavior("counter").is_none());

        post.emit("save");
        assert_eq!(first.saves.load(Ordering::SeqCst), 0);
        assert!(post.has_method("count"));
        assert!(matches!(post.call("count", vec![]), Err(JiiError::Application(_))));
        assert!(matches!(post.call("nothing", vec![]), Err(JiiError::Application(_))));
    }

    #[test]
    fn reattaching_moves_between_owners() {
        let a = Post::default();
        let b = Post::default();
        let shared: Arc<dyn Behavior> = counter("shared");
        a.attach_behavior("c", BehaviorSpec::Instance(shared.clone())).unwrap();
        b.attach_behavior("c", BehaviorSpec::Instance(shared.clone())).unwrap();

        a.emit("save");
        b.emit("save");
        let typed = b.behavior_as::<Counter>("c").unwrap();
        assert_eq!(typed.saves.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn previous_owner_cannot_detach_a_moved_behavior() {
        let a = Post::default();
        let b = Post::default();
        let shared = counter("shared");
        a.attach_behavior("c", BehaviorSpec::Instance(shared.clone())).unwrap();
        b.attach_behavior("c", BehaviorSpec::Instance(shared.clone())).unwrap();

        assert!(a.detach_behavior("c").is_some());
        assert!(a.get_behavior("c").is_none());
        assert!(shared.behavior().is_attached());

        b.emit("save");
        assert_eq!(shared.saves.load(Ordering::SeqCst), 1);
        assert_eq!(
            b.call("count", vec![]).unwrap(),
            Value::from("shared:component.test.Post:1")
        );

        a.detach_behaviors();
        b.detach_behaviors();
        assert!(!shared.behavior().is_attached());
    }

    #[test]
    fn class_handlers_are_visible_before_the_first_trigger() {
        #[derive(Default)]
        struct Draft {
            core: ComponentCore,
        }
        impl Identifiable for Draft {
            fn type_name(&self) -> &'static str {
                "component.test.Draft"
            }
            fn parent_type_name(&self) -> Option<&'static str> {
                Some("component.test.Document")
            }
        }
        impl Object for Draft {}
        impl Component for Draft {
            fn component(&self) -> &ComponentCore {
                &self.core
            }
        }

        ClassEvents::on(
            "component.test.Document",
            "review",
            &HandlerSpec::function(|_| {}),
            Value::Null,
            false,
        )
        .unwrap();
        let draft = Draft::default();
        assert!(draft.has_event_handlers("review"));
        assert!(!draft.has_event_handlers("publish"));
    }

    #[test]
    fn ambiguous_component_keys_fail() {
        #[derive(Default)]
        struct Odd {
            core: ComponentCore,
        }
        impl Identifiable for Odd {
            fn type_name(&self) -> &'static str {
                "component.test.Odd"
            }
        }
        impl Object for Odd {
            fn member(&self, _name: &str) -> Member {
                Member {
                    field: true,
                    setter: true,
                    ..Member::NONE
                }
            }
        }
        impl Component for Odd {
            fn component(&self) -> &ComponentCore {
                &self.core
            }
        }

        let mut odd = Odd::default();
        assert!(matches!(
            odd.set("x", 1.into()),
            Err(JiiError::Config(ConfigError::Ambiguous { .. }))
        ));
    }
}
