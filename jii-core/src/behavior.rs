//! # Behaviors
//!
//! A behavior is a reusable bundle of event bindings and methods that can be
//! attached to one component at a time. While attached, the handlers listed
//! by [`Behavior::events`] are registered on the owner, and the names listed
//! by [`Behavior::methods`] become callable through
//! [`Component::call`](crate::Component::call).
//!
//! Attaching to a new owner detaches from the previous one first.

use crate::{
    component::Component,
    error::JiiError,
    event::{Event, EventTable, Handler, HandlerSpec},
    factory::{Constructor, Factory, ObjectSpec, build_object},
    identity::TypeInfo,
    object::Object,
    value::{Config, Instance, Value},
};
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{Arc, LazyLock, Weak},
};

/// Method names never proxied onto an owner.
pub const LIFECYCLE_METHODS: &[&str] = &["attach", "detach", "events", "init", "constructor"];

/// Whether `method` may be proxied onto an owner.
pub fn is_proxyable(method: &str) -> bool {
    !method.is_empty() && !method.starts_with('_') && !LIFECYCLE_METHODS.contains(&method)
}

struct OwnerLink {
    events: Weak<EventTable>,
    type_name: &'static str,
    bindings: Vec<(String, Handler)>,
}

/// Attachment state embedded in every behavior.
#[derive(Default)]
pub struct BehaviorCore {
    owner: RwLock<Option<OwnerLink>>,
}

impl BehaviorCore {
    /// Create a detached core.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the behavior is attached to a live owner.
    pub fn is_attached(&self) -> bool {
        self.owner
            .read()
            .as_ref()
            .is_some_and(|link| link.events.strong_count() > 0)
    }

    /// Type name of the current owner.
    pub fn owner_type(&self) -> Option<&'static str> {
        self.owner.read().as_ref().map(|link| link.type_name)
    }
}

impl fmt::Debug for BehaviorCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorCore")
            .field("owner", &self.owner_type())
            .finish()
    }
}

/// A bundle of event bindings and methods attachable to a component.
pub trait Behavior: Object {
    /// The embedded attachment state.
    fn behavior(&self) -> &BehaviorCore;

    /// Event name → method name pairs wired onto the owner while attached.
    fn events(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Run the handler method `method` for `event`.
    ///
    /// Returns `false` if the behavior has no such handler.
    fn handle(&self, method: &str, event: &mut Event<'_>) -> bool {
        let _ = (method, event);
        false
    }

    /// Method names proxied onto the owner.
    fn methods(&self) -> &'static [&'static str] {
        &[]
    }

    /// Invoke a proxied method on behalf of `owner`.
    fn call(&self, method: &str, owner: &dyn Component, args: Vec<Value>) -> Result<Value, JiiError> {
        let _ = (owner, args);
        Err(JiiError::application(format!(
            "behavior `{}` has no method `{method}`",
            self.type_name()
        )))
    }
}

/// Attach `behavior` to `owner`, detaching it from any previous owner.
pub fn attach(behavior: &Arc<dyn Behavior>, owner: &dyn Component) -> Result<(), JiiError> {
    detach(behavior.as_ref());

    let table = owner.component().events();
    let context = Instance::new(behavior.type_name(), behavior.clone());
    let mut bindings = Vec::new();

    for (event, method) in behavior.events() {
        let weak: Weak<dyn Behavior> = Arc::downgrade(behavior);
        let handler_method = method.clone();
        let handler = Handler::new(move |event| {
            let Some(behavior) = weak.upgrade() else {
                return;
            };
            if !behavior.handle(&handler_method, event) {
                tracing::warn!(
                    behavior = behavior.type_name(),
                    method = %handler_method,
                    "behavior has no handler for bound event"
                );
            }
        })
        .with_context(context.clone());

        table.on(&event, &HandlerSpec::from(handler.clone()), Value::Null, false)?;
        bindings.push((event, handler));
    }

    tracing::trace!(
        behavior = behavior.type_name(),
        owner = owner.type_name(),
        bindings = bindings.len(),
        "behavior attached"
    );
    *behavior.behavior().owner.write() = Some(OwnerLink {
        events: Arc::downgrade(table),
        type_name: owner.type_name(),
        bindings,
    });
    Ok(())
}

/// Detach `behavior` from its owner, removing its event bindings.
///
/// Does nothing if it is not attached.
pub fn detach(behavior: &dyn Behavior) {
    let Some(link) = behavior.behavior().owner.write().take() else {
        return;
    };
    release(behavior, link);
}

/// Detach `behavior` if `owner` is its current owner.
///
/// Returns `false`, leaving the bindings alone, when the behavior has since
/// moved to another owner or is not attached.
pub fn detach_from(behavior: &dyn Behavior, owner: &dyn Component) -> bool {
    let table = owner.component().events();
    let link = {
        let mut slot = behavior.behavior().owner.write();
        match slot.as_ref() {
            Some(link) if Weak::as_ptr(&link.events) == Arc::as_ptr(table) => slot.take(),
            _ => None,
        }
    };
    match link {
        Some(link) => {
            release(behavior, link);
            true
        }
        None => false,
    }
}

fn release(behavior: &dyn Behavior, link: OwnerLink) {
    if let Some(table) = link.events.upgrade() {
        for (event, handler) in &link.bindings {
            table.off_normalized(event, Some(handler));
        }
    }
    tracing::trace!(
        behavior = behavior.type_name(),
        owner = link.type_name,
        "behavior detached"
    );
}

// ============================================================================
// Construction
// ============================================================================

/// Any shape a behavior may be declared in.
#[derive(Clone)]
pub enum BehaviorSpec {
    /// A live behavior.
    Instance(Arc<dyn Behavior>),
    /// A configuration carrying a `className`.
    Config(Config),
    /// A registered class name.
    Class(String),
}

impl BehaviorSpec {
    /// Wrap a behavior value.
    pub fn instance<T: Behavior>(behavior: T) -> Self {
        BehaviorSpec::Instance(Arc::new(behavior))
    }

    /// Produce a live behavior, constructing it through the registry if needed.
    pub fn materialize(self) -> Result<Arc<dyn Behavior>, JiiError> {
        let spec = match self {
            BehaviorSpec::Instance(behavior) => return Ok(behavior),
            BehaviorSpec::Config(config) => ObjectSpec::Config(config),
            BehaviorSpec::Class(class) => ObjectSpec::Class(class),
        };
        behavior_registry().create(spec).map(Arc::from)
    }
}

impl From<Arc<dyn Behavior>> for BehaviorSpec {
    fn from(behavior: Arc<dyn Behavior>) -> Self {
        BehaviorSpec::Instance(behavior)
    }
}

impl From<Config> for BehaviorSpec {
    fn from(config: Config) -> Self {
        BehaviorSpec::Config(config)
    }
}

impl From<&str> for BehaviorSpec {
    fn from(class: &str) -> Self {
        BehaviorSpec::Class(class.to_string())
    }
}

impl TryFrom<Value> for BehaviorSpec {
    type Error = JiiError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(class) => Ok(BehaviorSpec::Class(class)),
            Value::Map(config) => Ok(BehaviorSpec::Config(config)),
            Value::Object(instance) => instance
                .get::<dyn Behavior>()
                .map(BehaviorSpec::Instance)
                .ok_or_else(|| {
                    JiiError::application(format!(
                        "object `{}` is not a behavior",
                        instance.type_name()
                    ))
                }),
            other => Err(JiiError::application(format!(
                "cannot build a behavior from a {} value",
                other.kind()
            ))),
        }
    }
}

impl fmt::Debug for BehaviorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BehaviorSpec::Instance(behavior) => write!(f, "Instance({})", behavior.type_name()),
            BehaviorSpec::Config(config) => f.debug_tuple("Config").field(config).finish(),
            BehaviorSpec::Class(class) => f.debug_tuple("Class").field(class).finish(),
        }
    }
}

/// Wrap a behavior into a [`Value`] so it can travel through configuration.
pub fn behavior_value(behavior: Arc<dyn Behavior>) -> Value {
    Value::Object(Instance::new(behavior.type_name(), behavior))
}

static BEHAVIORS: LazyLock<Factory<dyn Behavior>> = LazyLock::new(|| Factory::new("behavior"));

/// The process-wide behavior class registry.
pub fn behavior_registry() -> &'static Factory<dyn Behavior> {
    &BEHAVIORS
}

/// A constructor building `T` by default construction and configuration.
pub fn behavior_constructor<T>() -> Constructor<dyn Behavior>
where
    T: Behavior + TypeInfo + Default,
{
    Constructor::new(T::TYPE_NAME, T::PARENT_TYPE_NAME, |setup| {
        Ok(Box::new(build_object::<T>(setup)?) as Box<dyn Behavior>)
    })
}

/// Register `T` in the behavior registry under its type name.
pub fn register_behavior<T>()
where
    T: Behavior + TypeInfo + Default,
{
    behavior_registry().register(behavior_constructor::<T>());
}
