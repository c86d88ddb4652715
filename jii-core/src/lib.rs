//! # jii-core
//!
//! Object, event and behavior substrate for the Jii application framework.
//!
//! This crate has minimal dependencies and carries everything a plugin needs
//! to define components and behaviors without pulling in the dispatch layer.
//!
//! # Building blocks
//!
//! ## Identity ([`Identifiable`], [`TypeInfo`])
//!
//! Every participating type names itself with a stable dotted identifier
//! and optionally its parent. The lineage registry links those names so
//! class-level events can walk a type's ancestors.
//!
//! ## Configuration ([`Value`], [`Config`], [`merge_configs`])
//!
//! Insertion-ordered key/value maps describe how to build and initialize
//! objects. The reserved `className` key names the type.
//!
//! ## Object Factory ([`Factory`], [`ObjectSpec`], [`configure`])
//!
//! One registry of named constructors per product kind. Configuration keys
//! left after construction are applied through [`configure`] or
//! [`Component::set`].
//!
//! ## Events ([`Event`], [`EventTable`], [`ClassEvents`])
//!
//! Ordered, synchronous handler lists per instance and per type, stopped
//! early when a handler marks the event handled.
//!
//! ## Behaviors ([`Behavior`])
//!
//! Reusable bundles of event bindings and methods attached to a component.
//!
//! ## Components ([`Component`])
//!
//! The base live object combining the above.
//!
//! # Error Types
//!
//! - [`JiiError`] - Top-level error type
//! - [`ConfigError`] - Configuration errors
//! - [`PropertyError`] - Dynamic property errors

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub mod alias;
mod behavior;
mod class_event;
mod component;
mod error;
mod event;
mod factory;
mod identity;
mod object;
mod value;

// Re-exports
pub use alias::{AliasTable, get_alias, get_root_alias, set_alias};
pub use behavior::{
    Behavior, BehaviorCore, BehaviorSpec, LIFECYCLE_METHODS, attach, behavior_constructor,
    behavior_registry, behavior_value, detach, detach_from, is_proxyable, register_behavior,
};
pub use class_event::ClassEvents;
pub use component::{AsComponent, BEHAVIOR_PREFIX, Component, ComponentCore, EVENT_PREFIX};
pub use error::{
    BoxError, ConfigError, JiiError, PropertyError, report_error, reset_catch_handler,
    set_catch_handler,
};
pub use event::{
    Callback, Event, EventTable, Handler, HandlerSpec, register_static_handler, split_event_names,
};
pub use factory::{
    Constructor, Factory, ObjectSpec, Setup, build_component, build_object, component_constructor,
    component_registry, register_component,
};
pub use identity::{
    AsAny, Identifiable, Lineage, TypeInfo, ancestors, ensure_lineage, is_a, is_registered,
    parent_of, register_lineage,
};
pub use object::{Member, Object, configure};
pub use value::{CLASS_NAME_KEY, Config, Instance, Value, merge_configs, merge_into};

#[doc(hidden)]
pub use inventory;
