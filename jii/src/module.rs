//! # Modules
//!
//! A [`Module`] owns a tree of sub-modules, a registry of lazily built
//! components, a controller map and a table of inline actions. It resolves
//! route strings into runnable actions.
//!
//! # Route resolution
//!
//! [`Module::run_action`] splits the route at its first `/` into an id and
//! the remainder, then tries in order:
//!
//! 1. an inline action bound under `id/remainder` (`id/index` when the
//!    remainder is empty),
//! 2. the controller map entry for `id`,
//! 3. the sub-module `id`, resolving the remainder there,
//! 4. the controller map entry for the derived class name
//!    (`post-comment` → `PostCommentController`),
//! 5. the registered controller class `{controllerNamespace}.{Derived}`.
//!
//! Nothing matching is not an error: an informational log is emitted and
//! the dispatch resolves to [`Dispatch::Unresolved`].
//!
//! # Error route
//!
//! An error raised anywhere in the pipeline is reported to the catch
//! handler. If an error route is configured (here or on the nearest
//! ancestor) and differs from the failing route, the error is registered
//! on the context as `errorHandler` and the error route is dispatched once.

use crate::{
    action::{Action, ActionOutcome, FnAction},
    components::{ErrorHandler, register_builtin_components},
    context::Context,
    controller::{self, Controller, DEFAULT_ACTION, action_event, controller_registry},
    core_components::{Platform, Scope, core_class},
    naming::{controller_class_name, is_action_id, split_route},
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use jii_core::{
    BEHAVIOR_PREFIX, BehaviorSpec, CLASS_NAME_KEY, Component, ComponentCore, Config, ConfigError,
    EVENT_PREFIX, HandlerSpec, Identifiable, JiiError, Member, Object, ObjectSpec, PropertyError,
    Setup, Value, component_registry, merge_into, register_lineage, report_error,
};
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, LazyLock, Weak},
};

/// Type name of plain modules.
pub const MODULE_CLASS: &str = "jii.base.Module";

/// Default route of plain modules.
pub const DEFAULT_ROUTE: &str = "default";

/// Default namespace searched for derived controller classes.
pub const DEFAULT_CONTROLLER_NAMESPACE: &str = "app.controllers";

/// Context component id the error route fallback registers.
pub const ERROR_HANDLER_ID: &str = "errorHandler";

// ============================================================================
// Module classes
// ============================================================================

type ModuleInit = dyn Fn(&Arc<Module>) -> Result<(), JiiError> + Send + Sync;

/// A named module type with an optional initializer.
///
/// A sub-module declared with `className` runs its class initializer after
/// its configuration has been applied.
#[derive(Clone)]
pub struct ModuleClass {
    name: &'static str,
    parent: Option<&'static str>,
    init: Option<Arc<ModuleInit>>,
}

impl ModuleClass {
    /// A module class deriving from [`MODULE_CLASS`].
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            parent: Some(MODULE_CLASS),
            init: None,
        }
    }

    fn base() -> Self {
        Self {
            name: MODULE_CLASS,
            parent: None,
            init: None,
        }
    }

    /// Derive from another module class.
    pub fn with_parent(mut self, parent: &'static str) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Run `init` on every module of this class once it is configured.
    pub fn with_init<F>(mut self, init: F) -> Self
    where
        F: Fn(&Arc<Module>) -> Result<(), JiiError> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    /// The class name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ModuleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleClass")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("init", &self.init.is_some())
            .finish()
    }
}

static MODULE_CLASSES: LazyLock<RwLock<IndexMap<String, ModuleClass>>> =
    LazyLock::new(Default::default);

/// Register a module class by name.
pub fn register_module_class(class: ModuleClass) {
    register_lineage(class.name, class.parent);
    MODULE_CLASSES.write().insert(class.name.to_string(), class);
}

fn module_class(name: &str) -> Result<ModuleClass, ConfigError> {
    if name == MODULE_CLASS {
        return Ok(ModuleClass::base());
    }
    MODULE_CLASSES
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownClass(name.to_string()))
}

// ============================================================================
// Action filters
// ============================================================================

/// A hook pair run by a module around every action it dispatches.
///
/// Filters run after the module's `beforeAction` event, in registration
/// order. The first filter returning `false` cancels the action.
#[async_trait]
pub trait ActionFilter: Send + Sync {
    /// Runs before the action.
    async fn before_action(&self, action: &dyn Action, context: &Context) -> Result<bool, JiiError> {
        let _ = (action, context);
        Ok(true)
    }

    /// Runs after a completed action.
    async fn after_action(&self, action: &dyn Action, context: &Context) -> Result<(), JiiError> {
        let _ = (action, context);
        Ok(())
    }
}

// ============================================================================
// Dispatch result
// ============================================================================

/// How a routed dispatch ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The action ran. `None` means it produced no result.
    Completed(Option<Value>),
    /// A before-hook returned `false`. No response was sent.
    Cancelled,
    /// Nothing matched the route.
    Unresolved,
}

impl From<ActionOutcome> for Dispatch {
    fn from(outcome: ActionOutcome) -> Self {
        match outcome {
            ActionOutcome::Completed(result) => Dispatch::Completed(result),
            ActionOutcome::Cancelled => Dispatch::Cancelled,
        }
    }
}

// ============================================================================
// Module
// ============================================================================

enum Slot<T: ?Sized> {
    Live(Arc<T>),
    Pending(Config),
}

impl<T: ?Sized> Clone for Slot<T> {
    fn clone(&self) -> Self {
        match self {
            Slot::Live(live) => Slot::Live(live.clone()),
            Slot::Pending(config) => Slot::Pending(config.clone()),
        }
    }
}

struct ModuleState {
    default_route: String,
    error_route: Option<String>,
    controller_namespace: String,
    controller_map: IndexMap<String, Config>,
    components: IndexMap<String, Slot<dyn Component>>,
    modules: IndexMap<String, Slot<Module>>,
    // Last class declared per id, inherited by partial redeclarations.
    component_classes: HashMap<String, String>,
    module_classes: HashMap<String, String>,
    inline_actions: IndexMap<String, Arc<dyn Action>>,
    filters: Vec<Arc<dyn ActionFilter>>,
    params: Config,
}

impl Default for ModuleState {
    fn default() -> Self {
        Self {
            default_route: DEFAULT_ROUTE.to_string(),
            error_route: None,
            controller_namespace: DEFAULT_CONTROLLER_NAMESPACE.to_string(),
            controller_map: IndexMap::new(),
            components: IndexMap::new(),
            modules: IndexMap::new(),
            component_classes: HashMap::new(),
            module_classes: HashMap::new(),
            inline_actions: IndexMap::new(),
            filters: Vec::new(),
            params: Config::new(),
        }
    }
}

/// A node of the routing tree.
pub struct Module {
    core: ComponentCore,
    class: &'static str,
    parent_class: Option<&'static str>,
    id: RwLock<String>,
    platform: Platform,
    parent: RwLock<Weak<Module>>,
    this: Weak<Module>,
    state: RwLock<ModuleState>,
}

impl Module {
    /// A root server module.
    pub fn new(id: &str) -> Arc<Self> {
        Self::create(id, Weak::new(), &ModuleClass::base(), Platform::default())
    }

    /// A root module for `platform`.
    pub fn with_platform(id: &str, platform: Platform) -> Arc<Self> {
        Self::create(id, Weak::new(), &ModuleClass::base(), platform)
    }

    /// A root module built from configuration.
    ///
    /// `className` selects a registered [`ModuleClass`].
    pub fn from_config(id: &str, config: Config, platform: Platform) -> Result<Arc<Self>, JiiError> {
        Self::build(id, Weak::new(), config, platform)
    }

    pub(crate) fn create(
        id: &str,
        parent: Weak<Module>,
        class: &ModuleClass,
        platform: Platform,
    ) -> Arc<Self> {
        register_builtin_components();
        Arc::new_cyclic(|this| Module {
            core: ComponentCore::new(),
            class: class.name,
            parent_class: class.parent,
            id: RwLock::new(id.to_string()),
            platform,
            parent: RwLock::new(parent),
            this: this.clone(),
            state: RwLock::new(ModuleState::default()),
        })
    }

    fn build(
        id: &str,
        parent: Weak<Module>,
        mut config: Config,
        platform: Platform,
    ) -> Result<Arc<Self>, JiiError> {
        let class_name = config
            .take_class_name()?
            .unwrap_or_else(|| MODULE_CLASS.to_string());
        let class = module_class(&class_name)?;
        let module = Self::create(id, parent, &class, platform);
        module.configure(config)?;
        if let Some(init) = &class.init {
            init(&module)?;
        }
        tracing::debug!(module = %module.unique_id(), class = class.name, "module created");
        Ok(module)
    }

    /// Apply a module configuration.
    ///
    /// Besides the module properties, `on …` keys bind event handlers and
    /// `as …` keys attach behaviors. Unknown keys are rejected.
    pub fn configure(&self, config: Config) -> Result<(), JiiError> {
        for (key, value) in config {
            if key == CLASS_NAME_KEY {
                continue;
            }
            if let Some(event) = key.strip_prefix(EVENT_PREFIX) {
                let handler = HandlerSpec::try_from(value)?;
                self.on(event.trim(), &handler)?;
            } else if let Some(name) = key.strip_prefix(BEHAVIOR_PREFIX) {
                let spec = BehaviorSpec::try_from(value)?;
                self.attach_behavior(name.trim(), spec)?;
            } else {
                self.apply(&key, value)?;
            }
        }
        Ok(())
    }

    fn apply(&self, name: &str, value: Value) -> Result<(), JiiError> {
        match name {
            "defaultRoute" => self.set_default_route(&expect_string(name, value)?),
            "controllerNamespace" => {
                self.state.write().controller_namespace = expect_string(name, value)?;
            }
            "errorRoute" => {
                let route = match value {
                    Value::Null => None,
                    value => Some(expect_string(name, value)?),
                };
                self.state.write().error_route = route;
            }
            "params" => {
                let params = expect_map(name, value)?;
                merge_into(&mut self.state.write().params, &params);
            }
            "controllerMap" => {
                for (id, spec) in expect_map(name, value)? {
                    self.set_controller(&id, spec)?;
                }
            }
            "components" => {
                for (id, spec) in expect_map(name, value)? {
                    self.set_component(&id, spec)?;
                }
            }
            "modules" => {
                for (id, spec) in expect_map(name, value)? {
                    self.set_module(&id, spec)?;
                }
            }
            "id" | "uniqueId" => {
                return Err(PropertyError::ReadOnly {
                    type_name: self.class.to_string(),
                    property: name.to_string(),
                }
                .into());
            }
            _ => return Err(PropertyError::unknown(self.class, name).into()),
        }
        Ok(())
    }

    /// The module id.
    ///
    /// A live module mounted with [`set_module`](Self::set_module) takes the
    /// id it was mounted under.
    pub fn id(&self) -> String {
        self.id.read().clone()
    }

    /// The slash-joined ids from below the root down to this module.
    ///
    /// The root module has an empty unique id.
    pub fn unique_id(&self) -> String {
        let Some(parent) = self.parent() else {
            return String::new();
        };
        let prefix = parent.unique_id();
        if prefix.is_empty() {
            self.id()
        } else {
            format!("{prefix}/{}", self.id())
        }
    }

    /// The parent module.
    pub fn parent(&self) -> Option<Arc<Module>> {
        self.parent.read().upgrade()
    }

    /// The platform this module tree runs on.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The route used when an empty route is dispatched.
    pub fn default_route(&self) -> String {
        self.state.read().default_route.clone()
    }

    /// Replace the default route.
    pub fn set_default_route(&self, route: &str) {
        self.state.write().default_route = route.to_string();
    }

    /// The error route of this module or, failing that, the nearest ancestor.
    pub fn error_route(&self) -> Option<String> {
        let own = self.state.read().error_route.clone();
        own.or_else(|| self.parent().and_then(|parent| parent.error_route()))
    }

    /// Replace the error route.
    pub fn set_error_route(&self, route: Option<&str>) {
        self.state.write().error_route = route.map(str::to_string);
    }

    /// The namespace searched for derived controller classes.
    pub fn controller_namespace(&self) -> String {
        self.state.read().controller_namespace.clone()
    }

    /// Custom parameters.
    pub fn params(&self) -> Config {
        self.state.read().params.clone()
    }

    /// One custom parameter.
    pub fn param(&self, key: &str) -> Option<Value> {
        self.state.read().params.get(key).cloned()
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Declare component `id`, or remove it with null.
    ///
    /// A configuration without `className` inherits the class of the
    /// previous declaration under `id`, then falls back to the core
    /// component table. The component is built on first access.
    pub fn set_component(&self, id: &str, value: Value) -> Result<(), JiiError> {
        match value {
            Value::Null => {
                self.state.write().components.shift_remove(id);
                Ok(())
            }
            Value::Object(instance) => {
                let component = instance.get::<dyn Component>().ok_or_else(|| {
                    ConfigError::NotConstructible {
                        class: instance.type_name().to_string(),
                        kind: "component",
                    }
                })?;
                self.set_component_instance(id, component);
                Ok(())
            }
            value => {
                let inherited = self.state.read().component_classes.get(id).cloned();
                let fallback = core_class(self.platform, Scope::Application, id);
                let config = declaration(value, inherited.as_deref().or(fallback))?;
                let class = required_class(&config)?;
                component_registry().resolve(&class)?;

                let mut state = self.state.write();
                state.component_classes.insert(id.to_string(), class);
                state.components.insert(id.to_string(), Slot::Pending(config));
                Ok(())
            }
        }
    }

    /// Register a live component owned by this module.
    pub fn set_component_instance(&self, id: &str, component: Arc<dyn Component>) {
        let owner: Weak<dyn Component> = self.this.clone();
        component.component().set_owner(owner);
        self.state
            .write()
            .components
            .insert(id.to_string(), Slot::Live(component));
    }

    /// The component `id`, built now if it was only declared.
    pub fn get_component(&self, id: &str) -> Result<Option<Arc<dyn Component>>, JiiError> {
        let slot = self.state.read().components.get(id).cloned();
        let config = match slot {
            None => return Ok(None),
            Some(Slot::Live(component)) => return Ok(Some(component)),
            Some(Slot::Pending(config)) => config,
        };

        let owner: Weak<dyn Component> = self.this.clone();
        let setup = Setup::default().owned_by(owner);
        let component: Arc<dyn Component> =
            Arc::from(component_registry().create_with(ObjectSpec::Config(config), setup)?);
        tracing::debug!(
            module = %self.unique_id(),
            component = id,
            class = component.type_name(),
            "component created"
        );

        let mut state = self.state.write();
        match state.components.get(id) {
            Some(Slot::Live(existing)) => Ok(Some(existing.clone())),
            Some(Slot::Pending(_)) => {
                state
                    .components
                    .insert(id.to_string(), Slot::Live(component.clone()));
                Ok(Some(component))
            }
            None => Ok(Some(component)),
        }
    }

    /// The component `id`, downcast to `T`.
    pub fn component_as<T: Component>(&self, id: &str) -> Result<Option<Arc<T>>, JiiError> {
        Ok(self
            .get_component(id)?
            .and_then(|component| component.into_any_arc().downcast::<T>().ok()))
    }

    /// Whether component `id` is declared.
    pub fn has_component(&self, id: &str) -> bool {
        self.state.read().components.contains_key(id)
    }

    /// Declared component ids, in declaration order.
    pub fn component_ids(&self) -> Vec<String> {
        self.state.read().components.keys().cloned().collect()
    }

    // ------------------------------------------------------------------
    // Sub-modules
    // ------------------------------------------------------------------

    /// Declare sub-module `id`, or remove it with null.
    ///
    /// A dotted id (`admin.content`) declares a grandchild. A configuration
    /// without `className` inherits the class of the previous declaration.
    pub fn set_module(&self, id: &str, value: Value) -> Result<(), JiiError> {
        if let Some((head, rest)) = id.split_once('.') {
            let child = self
                .get_module(head)?
                .ok_or_else(|| ConfigError::Malformed(format!("unknown module `{head}`")))?;
            return child.set_module(rest, value);
        }

        match value {
            Value::Null => {
                self.state.write().modules.shift_remove(id);
            }
            Value::Object(instance) => {
                let module = instance.get::<Module>().ok_or_else(|| {
                    ConfigError::NotConstructible {
                        class: instance.type_name().to_string(),
                        kind: "module",
                    }
                })?;
                self.mount(id, &module)?;
                self.state
                    .write()
                    .modules
                    .insert(id.to_string(), Slot::Live(module));
            }
            value => {
                let inherited = self.state.read().module_classes.get(id).cloned();
                let config = declaration(value, inherited.as_deref().or(Some(MODULE_CLASS)))?;
                let class = required_class(&config)?;
                module_class(&class)?;

                let mut state = self.state.write();
                state.module_classes.insert(id.to_string(), class);
                state.modules.insert(id.to_string(), Slot::Pending(config));
            }
        }
        Ok(())
    }

    /// Re-parent a live module under this one as `id`.
    ///
    /// A module already mounted elsewhere, or one that is this module or one
    /// of its ancestors, is rejected.
    fn mount(&self, id: &str, module: &Arc<Module>) -> Result<(), JiiError> {
        let mut node = self.this.upgrade();
        while let Some(current) = node {
            if Arc::ptr_eq(&current, module) {
                return Err(ConfigError::Malformed(format!(
                    "module `{id}` cannot be mounted inside itself"
                ))
                .into());
            }
            node = current.parent();
        }
        if let Some(parent) = module.parent() {
            if !std::ptr::eq(Arc::as_ptr(&parent), self) {
                return Err(ConfigError::Malformed(format!(
                    "module `{}` is already mounted under `{}`",
                    module.id(),
                    parent.unique_id()
                ))
                .into());
            }
        }

        *module.parent.write() = self.this.clone();
        *module.id.write() = id.to_string();
        tracing::debug!(module = %module.unique_id(), "module mounted");
        Ok(())
    }

    /// The sub-module `id`, built now if it was only declared.
    pub fn get_module(&self, id: &str) -> Result<Option<Arc<Module>>, JiiError> {
        if let Some((head, rest)) = id.split_once('.') {
            return match self.get_module(head)? {
                Some(child) => child.get_module(rest),
                None => Ok(None),
            };
        }

        let slot = self.state.read().modules.get(id).cloned();
        let config = match slot {
            None => return Ok(None),
            Some(Slot::Live(module)) => return Ok(Some(module)),
            Some(Slot::Pending(config)) => config,
        };

        let module = Self::build(id, self.this.clone(), config, self.platform)?;
        let mut state = self.state.write();
        match state.modules.get(id) {
            Some(Slot::Live(existing)) => Ok(Some(existing.clone())),
            Some(Slot::Pending(_)) => {
                state
                    .modules
                    .insert(id.to_string(), Slot::Live(module.clone()));
                Ok(Some(module))
            }
            None => Ok(Some(module)),
        }
    }

    /// Whether sub-module `id` is declared. Dotted ids build intermediate modules.
    pub fn has_module(&self, id: &str) -> bool {
        match id.split_once('.') {
            Some((head, rest)) => matches!(self.get_module(head), Ok(Some(child)) if child.has_module(rest)),
            None => self.state.read().modules.contains_key(id),
        }
    }

    // ------------------------------------------------------------------
    // Controllers and inline actions
    // ------------------------------------------------------------------

    /// Map controller `id` (or a derived class name) to a controller class.
    pub fn set_controller(&self, id: &str, value: Value) -> Result<(), JiiError> {
        if value.is_null() {
            self.state.write().controller_map.shift_remove(id);
            return Ok(());
        }
        let inherited = self
            .state
            .read()
            .controller_map
            .get(id)
            .and_then(|config| config.class_name().map(str::to_string));
        let config = declaration(value, inherited.as_deref())?;
        required_class(&config)?;
        self.state
            .write()
            .controller_map
            .insert(id.to_string(), config);
        Ok(())
    }

    /// Bind `action` to `route`. A route without `/` is bound as `route/index`.
    pub fn bind_action(&self, route: &str, action: Arc<dyn Action>) {
        let key = inline_key(route);
        action.action().bind(&key, None);
        self.state.write().inline_actions.insert(key, action);
    }

    /// Bind an async closure to `route`.
    ///
    /// ```rust,ignore
    /// module.bind_fn("health", |_context| Box::pin(async { Ok(Some("ok".into())) }));
    /// ```
    pub fn bind_fn<F>(&self, route: &str, body: F)
    where
        F: for<'c> Fn(&'c Context) -> BoxFuture<'c, Result<Option<Value>, JiiError>>
            + Send
            + Sync
            + 'static,
    {
        self.bind_action(route, Arc::new(FnAction::new(body)));
    }

    /// Add a filter run around every action of this module.
    pub fn add_filter<F: ActionFilter + 'static>(&self, filter: F) {
        self.state.write().filters.push(Arc::new(filter));
    }

    /// Resolve `route` to a controller and the remaining action id.
    ///
    /// An empty route resolves the default route.
    pub fn create_controller(
        &self,
        route: &str,
    ) -> Result<Option<(Arc<dyn Controller>, String)>, JiiError> {
        let route = if route.is_empty() {
            self.default_route()
        } else {
            route.to_string()
        };
        let (id, rest) = split_route(&route);
        if id.is_empty() {
            return Ok(None);
        }

        let mapped = self.state.read().controller_map.get(id).cloned();
        if let Some(config) = mapped {
            return Ok(Some((self.build_controller(id, config)?, rest.to_string())));
        }
        if let Some(module) = self.get_module(id)? {
            tracing::debug!(module = %module.unique_id(), route = rest, "descending into module");
            return module.create_controller(rest);
        }
        if !is_action_id(id) {
            return Ok(None);
        }

        let derived = controller_class_name(id);
        let mapped = self.state.read().controller_map.get(&derived).cloned();
        if let Some(config) = mapped {
            return Ok(Some((self.build_controller(id, config)?, rest.to_string())));
        }
        let class = format!("{}.{derived}", self.controller_namespace());
        if controller_registry().contains(&class) {
            let config = Config::new().with(CLASS_NAME_KEY, class);
            return Ok(Some((self.build_controller(id, config)?, rest.to_string())));
        }
        Ok(None)
    }

    fn build_controller(&self, id: &str, config: Config) -> Result<Arc<dyn Controller>, JiiError> {
        let owner: Weak<dyn Component> = self.this.clone();
        let setup = Setup::default().owned_by(owner);
        let controller: Arc<dyn Controller> =
            Arc::from(controller_registry().create_with(ObjectSpec::Config(config), setup)?);
        controller.controller().bind(id, self.this.clone());
        tracing::debug!(
            controller = %controller.unique_id(),
            class = controller.type_name(),
            "controller created"
        );
        Ok(controller)
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Runs before every action of this module.
    ///
    /// Triggers `beforeAction` (a handler cancels by setting the `isValid`
    /// param to `false`), then runs the filters.
    pub async fn before_action(&self, action: &dyn Action, context: &Context) -> Result<bool, JiiError> {
        if !action_event(self, "beforeAction", &action.id()) {
            return Ok(false);
        }
        let filters = self.state.read().filters.clone();
        for filter in filters {
            if !filter.before_action(action, context).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Runs after every completed action of this module.
    pub async fn after_action(&self, action: &dyn Action, context: &Context) -> Result<(), JiiError> {
        action_event(self, "afterAction", &action.id());
        let filters = self.state.read().filters.clone();
        for filter in filters {
            filter.after_action(action, context).await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Dispatch `route` with `context`.
    ///
    /// Errors are reported to the catch handler. They are recovered by the
    /// error route when one applies, and returned otherwise.
    pub fn run_action<'a>(
        &'a self,
        route: &'a str,
        context: &'a Context,
    ) -> BoxFuture<'a, Result<Dispatch, JiiError>> {
        Box::pin(async move {
            let err = match self.dispatch(route, context).await {
                Ok(dispatch) => return Ok(dispatch),
                Err(err) => err,
            };
            report_error(&err);

            match self.error_route() {
                Some(error_route) if error_route != route => {
                    tracing::debug!(
                        module = %self.unique_id(),
                        route,
                        error_route = %error_route,
                        "dispatching error route"
                    );
                    let handler = ErrorHandler::new(Arc::new(err));
                    context.set_component_instance(ERROR_HANDLER_ID, Arc::new(handler));
                    self.run_action(&error_route, context).await
                }
                _ => Err(err),
            }
        })
    }

    async fn dispatch(&self, route: &str, context: &Context) -> Result<Dispatch, JiiError> {
        let route = if route.is_empty() {
            self.default_route()
        } else {
            route.to_string()
        };

        let inline = self
            .state
            .read()
            .inline_actions
            .get(&inline_key(&route))
            .cloned();
        if let Some(action) = inline {
            return self.run_inline(action, context).await;
        }

        match self.create_controller(&route)? {
            Some((controller, action_id)) => {
                Ok(controller::run_action(&controller, &action_id, context).await?.into())
            }
            None => {
                tracing::info!(module = %self.unique_id(), route = %route, "unable to resolve route");
                Ok(Dispatch::Unresolved)
            }
        }
    }

    async fn run_inline(&self, action: Arc<dyn Action>, context: &Context) -> Result<Dispatch, JiiError> {
        if !self.before_action(action.as_ref(), context).await? {
            tracing::debug!(action = %action.id(), "inline action cancelled by before hook");
            return Ok(Dispatch::Cancelled);
        }
        let ActionOutcome::Completed(result) = action.run_with_params(context).await? else {
            return Ok(Dispatch::Cancelled);
        };
        if let (Some(data), Some(response)) = (&result, context.response()) {
            response.set_data(data.clone());
        }
        if let Some(response) = context.response() {
            response.send()?;
        }
        Ok(Dispatch::Completed(result))
    }
}

fn inline_key(route: &str) -> String {
    let (id, rest) = split_route(route);
    let rest = if rest.is_empty() { DEFAULT_ACTION } else { rest };
    format!("{id}/{rest}")
}

fn declaration(value: Value, default_class: Option<&str>) -> Result<Config, JiiError> {
    let mut config = match value {
        Value::String(class) => return Ok(Config::new().with(CLASS_NAME_KEY, class)),
        Value::Map(config) => config,
        other => {
            return Err(ConfigError::Malformed(format!(
                "expected a class name or a configuration, got {}",
                other.kind()
            ))
            .into());
        }
    };
    if config.class_name().is_none() {
        if let Some(class) = default_class {
            config.insert(CLASS_NAME_KEY, class);
        }
    }
    Ok(config)
}

fn required_class(config: &Config) -> Result<String, ConfigError> {
    config
        .class_name()
        .map(str::to_string)
        .ok_or(ConfigError::MissingClassName)
}

fn expect_string(name: &str, value: Value) -> Result<String, JiiError> {
    match value {
        Value::String(value) => Ok(value),
        _ => Err(PropertyError::invalid(MODULE_CLASS, name, "string").into()),
    }
}

fn expect_map(name: &str, value: Value) -> Result<Config, JiiError> {
    match value {
        Value::Map(map) => Ok(map),
        _ => Err(PropertyError::invalid(MODULE_CLASS, name, "map").into()),
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("Module")
            .field("class", &self.class)
            .field("id", &self.id())
            .field("default_route", &state.default_route)
            .field("error_route", &state.error_route)
            .field("components", &state.components.keys().collect::<Vec<_>>())
            .field("modules", &state.modules.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Identifiable for Module {
    fn type_name(&self) -> &'static str {
        self.class
    }

    fn parent_type_name(&self) -> Option<&'static str> {
        self.parent_class
    }
}

impl Object for Module {
    fn member(&self, name: &str) -> Member {
        match name {
            "id" | "uniqueId" => Member::READ_ONLY,
            "defaultRoute" | "errorRoute" | "controllerNamespace" | "params" => Member::ACCESSOR,
            "controllerMap" | "components" | "modules" => Member::WRITE_ONLY,
            _ => Member::NONE,
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        self.apply(name, value)
    }

    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        match name {
            "id" => Ok(self.id().into()),
            "uniqueId" => Ok(self.unique_id().into()),
            "defaultRoute" => Ok(self.default_route().into()),
            "errorRoute" => Ok(self.error_route().into()),
            "controllerNamespace" => Ok(self.controller_namespace().into()),
            "params" => Ok(self.params().into()),
            _ => Err(PropertyError::unknown(self.class, name).into()),
        }
    }
}

impl Component for Module {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Logger;
    use jii_core::Instance;
    use serde_json::json;

    fn config(value: serde_json::Value) -> Config {
        Config::from_json(value).unwrap()
    }

    #[test]
    fn configuration_sets_routes_and_params() {
        let module = Module::from_config(
            "root",
            config(json!({
                "defaultRoute": "home",
                "errorRoute": "error/show",
                "params": {"adminEmail": "admin@example.com"},
            })),
            Platform::Server,
        )
        .unwrap();

        assert_eq!(module.default_route(), "home");
        assert_eq!(module.error_route().as_deref(), Some("error/show"));
        assert_eq!(module.param("adminEmail"), Some(Value::from("admin@example.com")));
        assert_eq!(module.get("defaultRoute").unwrap(), Value::from("home"));
        assert_eq!(module.unique_id(), "");
    }

    #[test]
    fn read_only_and_unknown_keys_fail() {
        let module = Module::new("root");
        let err = module.configure(config(json!({"id": "other"}))).unwrap_err();
        assert!(matches!(err, JiiError::Property(PropertyError::ReadOnly { .. })));

        let err = module.configure(config(json!({"colour": "red"}))).unwrap_err();
        assert!(matches!(err, JiiError::Property(PropertyError::Unknown { .. })));
    }

    #[test]
    fn components_are_built_lazily_with_the_module_as_owner() {
        let module = Module::new("root");
        module
            .set_component("logger", config(json!({"category": "http"})).into())
            .unwrap();
        assert!(module.has_component("logger"));

        let logger = module.component_as::<Logger>("logger").unwrap().unwrap();
        assert_eq!(logger.category(), "http");
        let owner = logger.owner().unwrap();
        assert_eq!(owner.type_name(), MODULE_CLASS);

        let again = module.component_as::<Logger>("logger").unwrap().unwrap();
        assert!(Arc::ptr_eq(&logger, &again));
    }

    #[test]
    fn partial_redeclaration_inherits_the_class() {
        let module = Module::new("root");
        module
            .set_component("audit", "jii.components.Logger".into())
            .unwrap();
        module
            .set_component("audit", config(json!({"category": "audit"})).into())
            .unwrap();
        let audit = module.component_as::<Logger>("audit").unwrap().unwrap();
        assert_eq!(audit.category(), "audit");

        let err = module
            .set_component("cache", config(json!({"ttl": 5})).into())
            .unwrap_err();
        assert!(matches!(err, JiiError::Config(ConfigError::MissingClassName)));
    }

    #[test]
    fn null_removes_components() {
        let module = Module::new("root");
        module.set_component("logger", Value::Map(Config::new())).unwrap();
        module.set_component("logger", Value::Null).unwrap();
        assert!(!module.has_component("logger"));
        assert!(module.get_component("logger").unwrap().is_none());
    }

    #[test]
    fn dotted_module_ids_address_grandchildren() {
        let module = Module::new("root");
        module
            .configure(config(json!({
                "modules": {"admin": {"modules": {"content": {"defaultRoute": "page"}}}},
            })))
            .unwrap();

        assert!(module.has_module("admin"));
        assert!(module.has_module("admin.content"));
        let content = module.get_module("admin.content").unwrap().unwrap();
        assert_eq!(content.unique_id(), "admin/content");
        assert_eq!(content.default_route(), "page");

        module
            .set_module("admin.reports", Value::Map(Config::new()))
            .unwrap();
        assert!(module.has_module("admin.reports"));
        assert!(!module.has_module("admin.missing"));
    }

    #[test]
    fn module_classes_run_their_initializer() {
        register_module_class(ModuleClass::new("module.test.Forum").with_init(|module| {
            module.set_default_route("thread");
            Ok(())
        }));
        let module = Module::new("root");
        module
            .set_module("forum", config(json!({"className": "module.test.Forum"})).into())
            .unwrap();
        let forum = module.get_module("forum").unwrap().unwrap();
        assert_eq!(forum.type_name(), "module.test.Forum");
        assert_eq!(forum.default_route(), "thread");

        let err = module
            .set_module("board", config(json!({"className": "module.test.Missing"})).into())
            .unwrap_err();
        assert!(matches!(err, JiiError::Config(ConfigError::UnknownClass(_))));
    }

    #[test]
    fn live_modules_can_be_mounted() {
        let root = Module::new("root");
        let shared = Module::new("shared");
        root.set_module("shared", Value::Object(Instance::new(MODULE_CLASS, shared.clone())))
            .unwrap();
        let mounted = root.get_module("shared").unwrap().unwrap();
        assert!(Arc::ptr_eq(&mounted, &shared));
    }

    #[test]
    fn mounted_modules_take_the_mount_path() {
        let root = Module::new("root");
        root.set_error_route(Some("error/show"));
        root.set_module("tools", Value::Map(Config::new())).unwrap();
        let tools = root.get_module("tools").unwrap().unwrap();

        let shared = Module::new("shared");
        tools
            .set_module("admin", Value::Object(Instance::new(MODULE_CLASS, shared.clone())))
            .unwrap();
        assert_eq!(shared.id(), "admin");
        assert_eq!(shared.unique_id(), "tools/admin");
        assert_eq!(shared.error_route().as_deref(), Some("error/show"));
        assert!(Arc::ptr_eq(&shared.parent().unwrap(), &tools));
        assert_eq!(shared.get("uniqueId").unwrap(), Value::from("tools/admin"));
    }

    #[test]
    fn mounting_rejects_other_parents_and_cycles() {
        let root = Module::new("root");
        let shared = Module::new("shared");
        root.set_module("shared", Value::Object(Instance::new(MODULE_CLASS, shared.clone())))
            .unwrap();

        let other = Module::new("other");
        let err = other
            .set_module("shared", Value::Object(Instance::new(MODULE_CLASS, shared.clone())))
            .unwrap_err();
        assert!(matches!(err, JiiError::Config(ConfigError::Malformed(_))));
        assert!(!other.has_module("shared"));

        let err = shared
            .set_module("loop", Value::Object(Instance::new(MODULE_CLASS, root.clone())))
            .unwrap_err();
        assert!(matches!(err, JiiError::Config(ConfigError::Malformed(_))));
    }

    #[test]
    fn error_route_is_inherited() {
        let root = Module::new("root");
        root.set_error_route(Some("error/show"));
        root.set_module("admin", Value::Map(Config::new())).unwrap();
        let admin = root.get_module("admin").unwrap().unwrap();
        assert_eq!(admin.error_route().as_deref(), Some("error/show"));
    }

    #[test]
    fn inline_keys_default_to_index() {
        assert_eq!(inline_key("health"), "health/index");
        assert_eq!(inline_key("health/"), "health/index");
        assert_eq!(inline_key("a/b/c"), "a/b/c");
    }
}
