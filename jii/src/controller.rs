//! # Controllers
//!
//! A controller groups actions under one route segment. Actions resolve in
//! this order:
//!
//! 1. the external action map returned by [`Controller::actions`],
//! 2. an `action*` method reported by [`Controller::has_action_method`],
//!    wrapped as an [`InlineAction`].
//!
//! [`run_action`] drives one action through the module and controller
//! hooks and finally sends the response.

use crate::{
    action::{Action, ActionOutcome, InlineAction, action_registry},
    context::Context,
    module::Module,
    naming::{action_method_name, is_action_id},
};
use async_trait::async_trait;
use jii_core::{
    Component, Config, Constructor, Event, Factory, Identifiable, JiiError, Setup, TypeInfo,
    Value, build_component,
};
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{Arc, LazyLock, Weak},
};

/// Action id used when a route names only the controller.
pub const DEFAULT_ACTION: &str = "index";

/// Binding state embedded in every controller.
#[derive(Default)]
pub struct ControllerCore {
    id: RwLock<String>,
    module: RwLock<Weak<Module>>,
}

impl ControllerCore {
    /// Create an unbound core.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the controller to its id and owning module.
    pub fn bind(&self, id: &str, module: Weak<Module>) {
        *self.id.write() = id.to_string();
        *self.module.write() = module;
    }

    /// The controller id.
    pub fn id(&self) -> String {
        self.id.read().clone()
    }

    /// The owning module, while it is alive.
    pub fn module(&self) -> Option<Arc<Module>> {
        self.module.read().upgrade()
    }
}

impl fmt::Debug for ControllerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerCore")
            .field("id", &*self.id.read())
            .field("module", &self.module().map(|m| m.unique_id()))
            .finish()
    }
}

/// A group of actions under one route segment.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct SiteController { core: ComponentCore, controller: ControllerCore }
///
/// impl Object for SiteController {
///     fn member(&self, name: &str) -> Member {
///         match name {
///             "actionIndex" => Member::METHOD,
///             _ => Member::NONE,
///         }
///     }
/// }
///
/// #[async_trait]
/// impl Controller for SiteController {
///     fn controller(&self) -> &ControllerCore { &self.controller }
///
///     async fn run_method(&self, method: &str, _context: &Context) -> Result<Option<Value>, JiiError> {
///         match method {
///             "actionIndex" => Ok(Some("home".into())),
///             _ => Err(JiiError::application(format!("no method {method}"))),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Controller: Component {
    /// The embedded binding state.
    fn controller(&self) -> &ControllerCore;

    /// The controller id.
    fn id(&self) -> String {
        self.controller().id()
    }

    /// The owning module.
    fn module(&self) -> Option<Arc<Module>> {
        self.controller().module()
    }

    /// The module-qualified id.
    fn unique_id(&self) -> String {
        let id = self.id();
        match self.module().map(|module| module.unique_id()) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}/{id}"),
            _ => id,
        }
    }

    /// The action id used when the route names none.
    fn default_action(&self) -> String {
        DEFAULT_ACTION.to_string()
    }

    /// External actions keyed by id, as class names or configurations.
    fn actions(&self) -> Config {
        Config::new()
    }

    /// Whether `method` can back an inline action.
    fn has_action_method(&self, method: &str) -> bool {
        self.member(method).method
    }

    /// Run the controller method backing an inline action.
    async fn run_method(&self, method: &str, context: &Context) -> Result<Option<Value>, JiiError> {
        let _ = context;
        Err(JiiError::application(format!(
            "controller `{}` cannot run method `{method}`",
            self.type_name()
        )))
    }

    /// Runs before every action of this controller.
    ///
    /// Triggers `beforeAction`. A handler cancels by setting the `isValid`
    /// param to `false`.
    async fn before_action(&self, action: &dyn Action, context: &Context) -> Result<bool, JiiError> {
        let _ = context;
        Ok(action_event(self.as_component(), "beforeAction", &action.id()))
    }

    /// Runs after every completed action of this controller. Triggers `afterAction`.
    async fn after_action(&self, action: &dyn Action, context: &Context) -> Result<(), JiiError> {
        let _ = context;
        action_event(self.as_component(), "afterAction", &action.id());
        Ok(())
    }
}

/// Trigger an action hook event on `sender` and report whether it stayed valid.
pub(crate) fn action_event(sender: &dyn Component, name: &str, action: &str) -> bool {
    let mut event = Event::with_params(
        Config::new()
            .with("action", action)
            .with("isValid", true),
    );
    sender.trigger(name, &mut event);
    event
        .params
        .get("isValid")
        .is_none_or(|valid| !valid.is_falsy())
}

/// Resolve action `id` of `controller`.
///
/// An empty id selects [`Controller::default_action`]. Returns `None` when
/// neither an external action nor an action method matches.
pub fn create_action(
    controller: &Arc<dyn Controller>,
    id: &str,
) -> Result<Option<Arc<dyn Action>>, JiiError> {
    let id = if id.is_empty() {
        controller.default_action()
    } else {
        id.to_string()
    };

    if let Some(spec) = controller.actions().remove(&id) {
        let action = action_registry().create_from_value(spec, None, Setup::default())?;
        if let Some(action) = &action {
            action.action().bind(&id, Some(controller.clone()));
            tracing::debug!(action = %id, class = action.type_name(), "external action created");
        }
        return Ok(action);
    }

    if is_action_id(&id) {
        let method = action_method_name(&id);
        if controller.has_action_method(&method) {
            tracing::debug!(action = %id, method = %method, "inline action created");
            let action = InlineAction::new(&id, controller.clone(), method);
            return Ok(Some(Arc::new(action)));
        }
    }
    Ok(None)
}

/// Run action `id` of `controller`.
///
/// The module and controller before-hooks run concurrently. If either
/// returns `false` the action is abandoned and no response is sent. A
/// result is stored as the response data, the after-hooks run
/// concurrently, and the response is sent.
pub async fn run_action(
    controller: &Arc<dyn Controller>,
    id: &str,
    context: &Context,
) -> Result<ActionOutcome, JiiError> {
    let action = create_action(controller, id)?.ok_or_else(|| {
        JiiError::InvalidRoute(format!("unable to resolve action `{}/{id}`", controller.unique_id()))
    })?;
    let module = controller.module();

    let (module_valid, controller_valid) = futures::join!(
        async {
            match &module {
                Some(module) => module.before_action(action.as_ref(), context).await,
                None => Ok(true),
            }
        },
        controller.before_action(action.as_ref(), context),
    );
    if !(module_valid? && controller_valid?) {
        tracing::debug!(action = %action.unique_id(), "action cancelled by before hook");
        return Ok(ActionOutcome::Cancelled);
    }

    let ActionOutcome::Completed(result) = action.run_with_params(context).await? else {
        return Ok(ActionOutcome::Cancelled);
    };
    if let (Some(data), Some(response)) = (&result, context.response()) {
        response.set_data(data.clone());
    }

    let (module_done, controller_done) = futures::join!(
        async {
            match &module {
                Some(module) => module.after_action(action.as_ref(), context).await,
                None => Ok(()),
            }
        },
        controller.after_action(action.as_ref(), context),
    );
    module_done?;
    controller_done?;

    if let Some(response) = context.response() {
        response.send()?;
    }
    Ok(ActionOutcome::Completed(result))
}

// ============================================================================
// Registry
// ============================================================================

static CONTROLLERS: LazyLock<Factory<dyn Controller>> =
    LazyLock::new(|| Factory::new("controller"));

/// The process-wide controller class registry.
pub fn controller_registry() -> &'static Factory<dyn Controller> {
    &CONTROLLERS
}

/// A constructor building `T` through [`build_component`].
pub fn controller_constructor<T>() -> Constructor<dyn Controller>
where
    T: Controller + TypeInfo + Default,
{
    Constructor::new(T::TYPE_NAME, T::PARENT_TYPE_NAME, |setup| {
        Ok(Box::new(build_component::<T>(setup)?) as Box<dyn Controller>)
    })
}

/// Register `T` in the controller registry under its type name.
pub fn register_controller<T>()
where
    T: Controller + TypeInfo + Default,
{
    controller_registry().register(controller_constructor::<T>());
}
