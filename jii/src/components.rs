//! Built-in components.

use jii_core::{
    Component, ComponentCore, Identifiable, JiiError, Member, Object, PropertyError, TypeInfo,
    Value, register_component,
};
use std::sync::{Arc, Once};

/// Register the built-in component classes.
pub(crate) fn register_builtin_components() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        register_component::<Logger>();
        register_component::<ErrorHandler>();
    });
}

// ============================================================================
// Logger
// ============================================================================

/// An application logger forwarding to `tracing` under a category.
#[derive(Debug, Default)]
pub struct Logger {
    core: ComponentCore,
    category: String,
}

impl Logger {
    /// The configured category.
    pub fn category(&self) -> &str {
        if self.category.is_empty() {
            "application"
        } else {
            &self.category
        }
    }

    /// Log an informational message.
    pub fn info(&self, message: &str) {
        tracing::info!(category = self.category(), "{message}");
    }

    /// Log a warning.
    pub fn warn(&self, message: &str) {
        tracing::warn!(category = self.category(), "{message}");
    }

    /// Log an error.
    pub fn error(&self, message: &str) {
        tracing::error!(category = self.category(), "{message}");
    }
}

impl Identifiable for Logger {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for Logger {
    const TYPE_NAME: &'static str = "jii.components.Logger";
}

impl Object for Logger {
    fn member(&self, name: &str) -> Member {
        match name {
            "category" => Member::FIELD,
            "info" | "warn" | "error" => Member::METHOD,
            _ => Member::NONE,
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        match (name, value) {
            ("category", Value::String(category)) => {
                self.category = category;
                Ok(())
            }
            ("category", _) => Err(PropertyError::invalid(Self::TYPE_NAME, name, "string").into()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }

    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        match name {
            "category" => Ok(self.category().into()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }
}

impl Component for Logger {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

// ============================================================================
// Error Handler
// ============================================================================

/// Carries the error that sent dispatch to the error route.
///
/// Registered on the context as `errorHandler` before the error route runs.
#[derive(Debug, Default)]
pub struct ErrorHandler {
    core: ComponentCore,
    error: Option<Arc<JiiError>>,
}

impl ErrorHandler {
    /// Wrap `error`.
    pub fn new(error: Arc<JiiError>) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// The intercepted error.
    pub fn error(&self) -> Option<&Arc<JiiError>> {
        self.error.as_ref()
    }
}

impl Identifiable for ErrorHandler {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for ErrorHandler {
    const TYPE_NAME: &'static str = "jii.components.ErrorHandler";
}

impl Object for ErrorHandler {
    fn member(&self, name: &str) -> Member {
        match name {
            "message" => Member::READ_ONLY,
            _ => Member::NONE,
        }
    }

    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        match name {
            "message" => Ok(self.error.as_ref().map(|e| e.to_string()).into()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }
}

impl Component for ErrorHandler {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}
