//! # Request Context
//!
//! A [`Context`] is created per dispatch and carries the route, the request
//! and response, and a registry of per-request components such as the
//! `errorHandler` installed by the error route fallback.

use crate::{
    components::{ErrorHandler, register_builtin_components},
    core_components::{Platform, Scope, core_class},
    request::{Request, request_registry},
    response::{Response, response_registry},
};
use jii_core::{
    Component, ComponentCore, Config, ConfigError, Identifiable, JiiError, Member, Object,
    PropertyError, Setup, TypeInfo, Value, component_registry,
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::{fmt, sync::Arc};

/// Per-dispatch carrier of request, response and components.
#[derive(Default)]
pub struct Context {
    core: ComponentCore,
    platform: Platform,
    route: RwLock<String>,
    request: RwLock<Option<Arc<dyn Request>>>,
    response: RwLock<Option<Arc<dyn Response>>>,
    components: RwLock<IndexMap<String, Arc<dyn Component>>>,
}

impl Context {
    /// An empty server context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from configuration.
    ///
    /// `request` and `response` accept a class name, a configuration (its
    /// `className` defaulting to the platform's core class) or a live
    /// object. `components` maps ids to component configurations. Every
    /// other key goes through [`Component::set`].
    pub fn from_config(mut config: Config, platform: Platform) -> Result<Self, JiiError> {
        register_builtin_components();
        let mut context = Context {
            platform,
            ..Self::default()
        };

        if let Some(request) = config.remove("request") {
            let default_class = core_class(platform, Scope::Context, "request");
            if let Some(request) =
                request_registry().create_from_value(request, default_class, Setup::default())?
            {
                context.set_request(request);
            }
        }
        if let Some(response) = config.remove("response") {
            let default_class = core_class(platform, Scope::Context, "response");
            if let Some(response) =
                response_registry().create_from_value(response, default_class, Setup::default())?
            {
                context.set_response(response);
            }
        }
        if let Some(components) = config.remove("components") {
            let Value::Map(components) = components else {
                return Err(ConfigError::Malformed("`components` must be a map".into()).into());
            };
            for (id, value) in components {
                context.set_component(&id, value)?;
            }
        }

        context.set_all(config)?;
        Ok(context)
    }

    /// The platform the context was built for.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The route being dispatched.
    pub fn route(&self) -> String {
        self.route.read().clone()
    }

    /// Set the route being dispatched.
    pub fn set_route(&self, route: &str) {
        *self.route.write() = route.to_string();
    }

    /// The request, if any.
    pub fn request(&self) -> Option<Arc<dyn Request>> {
        self.request.read().clone()
    }

    /// Replace the request.
    pub fn set_request(&self, request: Arc<dyn Request>) {
        *self.request.write() = Some(request);
    }

    /// The response, if any.
    pub fn response(&self) -> Option<Arc<dyn Response>> {
        self.response.read().clone()
    }

    /// Replace the response.
    pub fn set_response(&self, response: Arc<dyn Response>) {
        *self.response.write() = Some(response);
    }

    /// Register a component from a configuration value, or remove it with null.
    pub fn set_component(&self, id: &str, value: Value) -> Result<(), JiiError> {
        if value.is_null() {
            self.components.write().shift_remove(id);
            return Ok(());
        }
        let default_class = core_class(self.platform, Scope::Context, id);
        if let Some(component) =
            component_registry().create_from_value(value, default_class, Setup::default())?
        {
            self.set_component_instance(id, component);
        }
        Ok(())
    }

    /// Register a live component.
    pub fn set_component_instance(&self, id: &str, component: Arc<dyn Component>) {
        self.components.write().insert(id.to_string(), component);
    }

    /// The component registered under `id`.
    pub fn get_component(&self, id: &str) -> Option<Arc<dyn Component>> {
        self.components.read().get(id).cloned()
    }

    /// The component registered under `id`, downcast to `T`.
    pub fn component_as<T: Component>(&self, id: &str) -> Option<Arc<T>> {
        self.get_component(id)?.into_any_arc().downcast::<T>().ok()
    }

    /// Whether a component is registered under `id`.
    pub fn has_component(&self, id: &str) -> bool {
        self.components.read().contains_key(id)
    }

    /// The error that sent dispatch to the error route, if any.
    pub fn error(&self) -> Option<Arc<JiiError>> {
        self.component_as::<ErrorHandler>("errorHandler")
            .and_then(|handler| handler.error().cloned())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.platform)
            .field("route", &*self.route.read())
            .field("components", &self.components.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Identifiable for Context {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for Context {
    const TYPE_NAME: &'static str = "jii.base.Context";
}

impl Object for Context {
    fn member(&self, name: &str) -> Member {
        match name {
            "route" => Member::ACCESSOR,
            _ => Member::NONE,
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        match (name, value) {
            ("route", Value::String(route)) => {
                self.set_route(&route);
                Ok(())
            }
            ("route", _) => Err(PropertyError::invalid(Self::TYPE_NAME, name, "string").into()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }

    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        match name {
            "route" => Ok(self.route().into()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }
}

impl Component for Context {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}
