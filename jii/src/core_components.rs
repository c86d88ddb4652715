//! Default classes for well-known component ids.
//!
//! A component configured without a `className` under one of these ids gets
//! the listed class. The table differs between server and client platforms.

use serde::{Deserialize, Serialize};

/// Where the application runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// A server handling inbound requests.
    #[default]
    Server,
    /// A client-side application.
    Client,
}

/// Which object a core component belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Components of the application module.
    Application,
    /// Components of a per-request context.
    Context,
}

const SERVER_APPLICATION: &[(&str, &str)] = &[("logger", "jii.components.Logger")];

const CLIENT_APPLICATION: &[(&str, &str)] = &[("logger", "jii.components.Logger")];

const SERVER_CONTEXT: &[(&str, &str)] = &[
    ("request", "jii.request.MemoryRequest"),
    ("response", "jii.response.MemoryResponse"),
    ("errorHandler", "jii.components.ErrorHandler"),
];

// Client-side navigation has nothing to send back.
const CLIENT_CONTEXT: &[(&str, &str)] = &[
    ("request", "jii.request.MemoryRequest"),
    ("errorHandler", "jii.components.ErrorHandler"),
];

/// The core component table for a platform and scope.
pub fn core_components(platform: Platform, scope: Scope) -> &'static [(&'static str, &'static str)] {
    match (platform, scope) {
        (Platform::Server, Scope::Application) => SERVER_APPLICATION,
        (Platform::Client, Scope::Application) => CLIENT_APPLICATION,
        (Platform::Server, Scope::Context) => SERVER_CONTEXT,
        (Platform::Client, Scope::Context) => CLIENT_CONTEXT,
    }
}

/// The default class for component `id`.
pub fn core_class(platform: Platform, scope: Scope, id: &str) -> Option<&'static str> {
    core_components(platform, scope)
        .iter()
        .find(|(name, _)| *name == id)
        .map(|(_, class)| *class)
}
