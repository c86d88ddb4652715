//! # Actions
//!
//! The smallest executable unit bound to a route. An action is either:
//!
//! - an [`InlineAction`] wrapping an `action*` method of a controller,
//! - an external action class listed in [`Controller::actions`],
//! - an [`FnAction`] wrapping an async closure bound directly on a module.
//!
//! [`Action::run_with_params`] runs the lifecycle: `before_run`, `run`,
//! then `after_run`. A `false` from `before_run` abandons the action.

use crate::{context::Context, controller::Controller};
use async_trait::async_trait;
use futures::future::BoxFuture;
use jii_core::{
    Component, ComponentCore, Constructor, Factory, Identifiable, JiiError, Object, TypeInfo,
    Value, build_component,
};
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{Arc, LazyLock},
};

/// How an action run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The action ran. `None` means it produced no result.
    Completed(Option<Value>),
    /// A before-hook returned `false`.
    Cancelled,
}

/// Binding state embedded in every action.
#[derive(Default)]
pub struct ActionCore {
    id: RwLock<String>,
    controller: RwLock<Option<Arc<dyn Controller>>>,
}

impl ActionCore {
    /// Create an unbound core.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the action to its id and controller.
    pub fn bind(&self, id: &str, controller: Option<Arc<dyn Controller>>) {
        *self.id.write() = id.to_string();
        *self.controller.write() = controller;
    }

    /// The action id.
    pub fn id(&self) -> String {
        self.id.read().clone()
    }

    /// The controller the action belongs to.
    pub fn controller(&self) -> Option<Arc<dyn Controller>> {
        self.controller.read().clone()
    }
}

impl fmt::Debug for ActionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCore")
            .field("id", &*self.id.read())
            .field("controller", &self.controller.read().as_ref().map(|c| c.type_name()))
            .finish()
    }
}

/// An executable unit bound to a route.
#[async_trait]
pub trait Action: Component {
    /// The embedded binding state.
    fn action(&self) -> &ActionCore;

    /// The action id.
    fn id(&self) -> String {
        self.action().id()
    }

    /// The controller-qualified id, `controller/action`.
    fn unique_id(&self) -> String {
        match self.action().controller() {
            Some(controller) => format!("{}/{}", controller.unique_id(), self.id()),
            None => self.id(),
        }
    }

    /// Runs before [`run`](Self::run). Returning `false` abandons the action.
    async fn before_run(&self, context: &Context) -> Result<bool, JiiError> {
        let _ = context;
        Ok(true)
    }

    /// The action body.
    async fn run(&self, context: &Context) -> Result<Option<Value>, JiiError>;

    /// Runs after [`run`](Self::run).
    async fn after_run(&self, context: &Context) -> Result<(), JiiError> {
        let _ = context;
        Ok(())
    }

    /// Run the full lifecycle.
    async fn run_with_params(&self, context: &Context) -> Result<ActionOutcome, JiiError> {
        if !self.before_run(context).await? {
            tracing::debug!(action = %self.unique_id(), "action abandoned by before_run");
            return Ok(ActionOutcome::Cancelled);
        }
        let result = self.run(context).await?;
        self.after_run(context).await?;
        Ok(ActionOutcome::Completed(result))
    }
}

// ============================================================================
// Inline actions
// ============================================================================

/// An action backed by an `action*` method of its controller.
#[derive(Debug, Default)]
pub struct InlineAction {
    core: ComponentCore,
    action: ActionCore,
    method: String,
}

impl InlineAction {
    /// Wrap `method` of `controller` as action `id`.
    pub fn new(id: &str, controller: Arc<dyn Controller>, method: impl Into<String>) -> Self {
        let action = Self {
            method: method.into(),
            ..Self::default()
        };
        action.action.bind(id, Some(controller));
        action
    }

    /// The controller method name.
    pub fn method(&self) -> &str {
        &self.method
    }
}

impl Identifiable for InlineAction {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for InlineAction {
    const TYPE_NAME: &'static str = "jii.base.InlineAction";
}

impl Object for InlineAction {}

impl Component for InlineAction {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

#[async_trait]
impl Action for InlineAction {
    fn action(&self) -> &ActionCore {
        &self.action
    }

    async fn run(&self, context: &Context) -> Result<Option<Value>, JiiError> {
        let controller = self.action.controller().ok_or_else(|| {
            JiiError::application(format!("inline action `{}` has no controller", self.id()))
        })?;
        controller.run_method(&self.method, context).await
    }
}

// ============================================================================
// Closure actions
// ============================================================================

type ActionFn =
    dyn for<'c> Fn(&'c Context) -> BoxFuture<'c, Result<Option<Value>, JiiError>> + Send + Sync;

/// An action backed by an async closure.
///
/// ```rust,ignore
/// module.bind_fn("health", |_context| Box::pin(async { Ok(Some("ok".into())) }));
/// ```
pub struct FnAction {
    core: ComponentCore,
    action: ActionCore,
    body: Arc<ActionFn>,
}

impl FnAction {
    /// Wrap `body`.
    pub fn new<F>(body: F) -> Self
    where
        F: for<'c> Fn(&'c Context) -> BoxFuture<'c, Result<Option<Value>, JiiError>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            core: ComponentCore::new(),
            action: ActionCore::new(),
            body: Arc::new(body),
        }
    }
}

impl fmt::Debug for FnAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl Identifiable for FnAction {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for FnAction {
    const TYPE_NAME: &'static str = "jii.base.FnAction";
}

impl Object for FnAction {}

impl Component for FnAction {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

#[async_trait]
impl Action for FnAction {
    fn action(&self) -> &ActionCore {
        &self.action
    }

    async fn run(&self, context: &Context) -> Result<Option<Value>, JiiError> {
        (self.body)(context).await
    }
}

// ============================================================================
// Registry
// ============================================================================

static ACTIONS: LazyLock<Factory<dyn Action>> = LazyLock::new(|| Factory::new("action"));

/// The process-wide registry of external action classes.
pub fn action_registry() -> &'static Factory<dyn Action> {
    &ACTIONS
}

/// A constructor building `T` through [`build_component`].
pub fn action_constructor<T>() -> Constructor<dyn Action>
where
    T: Action + TypeInfo + Default,
{
    Constructor::new(T::TYPE_NAME, T::PARENT_TYPE_NAME, |setup| {
        Ok(Box::new(build_component::<T>(setup)?) as Box<dyn Action>)
    })
}

/// Register `T` in the action registry under its type name.
pub fn register_action<T>()
where
    T: Action + TypeInfo + Default,
{
    action_registry().register(action_constructor::<T>());
}
