//! # jii - Component and Dispatch Core
//!
//! `jii` turns declarative configuration into live components wired with
//! behaviors and event handlers, and resolves route strings through nested
//! modules and controllers into action invocations.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jii::prelude::*;
//!
//! let app = Application::from_json_str(r#"{
//!     "application": {"controllerMap": {"site": "app.controllers.SiteController"}}
//! }"#)?;
//! app.module().bind_fn("health", |_context| Box::pin(async { Ok(Some("ok".into())) }));
//!
//! let context = app.create_context(Config::new())?;
//! let dispatch = app.run_action("health", &context).await?;
//! ```
//!
//! ## Layers
//!
//! - [`jii_core`]: object factory, configuration, aliases, events, behaviors
//!   and the component base, re-exported here
//! - [`jii_std`]: standard behaviors and testing utilities
//! - this crate: [`Context`], [`Module`], [`Controller`], [`Action`] and
//!   [`Application`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod action;
mod application;
mod components;
mod context;
mod controller;
mod core_components;
mod module;
pub mod naming;
mod request;
mod response;

pub use jii_core::{
    // Aliases
    AliasTable,
    // Identity
    AsAny,
    // Components
    AsComponent,
    BEHAVIOR_PREFIX,
    // Behaviors
    Behavior,
    BehaviorCore,
    BehaviorSpec,
    // Errors
    BoxError,
    CLASS_NAME_KEY,
    // Events
    Callback,
    ClassEvents,
    Component,
    ComponentCore,
    // Configuration
    Config,
    ConfigError,
    // Factory
    Constructor,
    EVENT_PREFIX,
    Event,
    EventTable,
    Factory,
    Handler,
    HandlerSpec,
    Identifiable,
    Instance,
    JiiError,
    LIFECYCLE_METHODS,
    Lineage,
    // Objects
    Member,
    Object,
    ObjectSpec,
    PropertyError,
    Setup,
    TypeInfo,
    Value,
    ancestors,
    attach,
    behavior_constructor,
    behavior_registry,
    behavior_value,
    build_component,
    build_object,
    component_constructor,
    component_registry,
    configure,
    detach,
    detach_from,
    ensure_lineage,
    get_alias,
    get_root_alias,
    is_a,
    is_proxyable,
    is_registered,
    merge_configs,
    merge_into,
    parent_of,
    register_behavior,
    register_component,
    register_lineage,
    register_static_handler,
    report_error,
    reset_catch_handler,
    set_alias,
    set_catch_handler,
    split_event_names,
};

pub use action::{
    Action, ActionCore, ActionOutcome, FnAction, InlineAction, action_constructor,
    action_registry, register_action,
};
pub use application::{
    APPLICATION_CLASS, AppConfig, Application, DEFAULT_APPLICATION_ID, DEFAULT_APPLICATION_ROUTE,
};
pub use components::{ErrorHandler, Logger};
pub use context::Context;
pub use controller::{
    Controller, ControllerCore, DEFAULT_ACTION, controller_constructor, controller_registry,
    create_action, register_controller, run_action,
};
pub use core_components::{Platform, Scope, core_class, core_components};
pub use module::{
    ActionFilter, DEFAULT_CONTROLLER_NAMESPACE, DEFAULT_ROUTE, Dispatch, ERROR_HANDLER_ID,
    MODULE_CLASS, Module, ModuleClass, register_module_class,
};
pub use request::{MemoryRequest, Request, register_request, request_constructor, request_registry};
pub use response::{
    MemoryResponse, Response, register_response, response_constructor, response_registry,
};

pub use jii_std::register_standard_classes;

/// Standard behaviors.
pub mod behaviors {
    pub use jii_std::behaviors::{LogLevel, LoggingBehavior};
}

/// Testing utilities.
pub mod testing {
    pub use jii_std::testing::{CountingBehavior, EventLog, Recorded, RecordingHandler};
}

/// Prelude module - common imports for Jii.
///
/// # Usage
///
/// ```rust,ignore
/// use jii::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Action, ActionCore, AppConfig, Application, AsComponent, Behavior, BehaviorCore,
        BehaviorSpec, Component, ComponentCore, Config, Context, Controller, ControllerCore,
        Dispatch, Event, HandlerSpec, Identifiable, JiiError, Member, Module, Object, Request,
        Response, TypeInfo, Value,
    };
    pub use async_trait::async_trait;
}

#[cfg(feature = "macros")]
pub use jii_macros::Identifiable;

#[doc(hidden)]
pub use inventory;
