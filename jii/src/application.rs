//! # Application
//!
//! The root of the module tree. An [`Application`] is built from an
//! [`AppConfig`]:
//!
//! ```json
//! {
//!     "platform": "server",
//!     "application": {
//!         "id": "shop",
//!         "basePath": "/srv/shop",
//!         "aliases": {"@assets": "@app/public/assets"},
//!         "bootstrap": ["logger"],
//!         "controllerMap": {"site": "app.controllers.SiteController"}
//!     },
//!     "context": {"components": {}}
//! }
//! ```
//!
//! The `context` section is retained and deep-merged into every context
//! created through [`Application::create_context`].

use crate::{
    context::Context,
    core_components::Platform,
    module::{Dispatch, Module, ModuleClass},
};
use jii_core::{Config, ConfigError, JiiError, Value, get_alias, merge_configs, set_alias};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Type name of the application module.
pub const APPLICATION_CLASS: &str = "jii.base.Application";

/// Default application id.
pub const DEFAULT_APPLICATION_ID: &str = "app";

/// Default route of the application module.
pub const DEFAULT_APPLICATION_ROUTE: &str = "site";

/// Bootstrap configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration of the application module.
    pub application: Config,
    /// Configuration merged into every created context.
    pub context: Config,
    /// Platform variant selecting the core component table.
    pub platform: Platform,
}

impl AppConfig {
    /// Parse a bootstrap configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, JiiError> {
        serde_json::from_str(json)
            .map_err(|err| ConfigError::Malformed(err.to_string()).into())
    }
}

/// The application: root module plus retained context configuration.
#[derive(Debug)]
pub struct Application {
    module: Arc<Module>,
    context: Config,
    platform: Platform,
}

impl Application {
    /// Build the application.
    ///
    /// `basePath` sets `@app`, `aliases` registers further aliases, `id`
    /// names the root module and `bootstrap` lists component ids built
    /// eagerly. Every other key configures the root module.
    pub fn new(config: AppConfig) -> Result<Self, JiiError> {
        let AppConfig {
            mut application,
            context,
            platform,
        } = config;

        if let Some(base_path) = application.remove("basePath") {
            let Value::String(base_path) = base_path else {
                return Err(ConfigError::Malformed("`basePath` must be a string".into()).into());
            };
            set_alias("@app", Some(&base_path))?;
        }
        if let Some(aliases) = application.remove("aliases") {
            let Value::Map(aliases) = aliases else {
                return Err(ConfigError::Malformed("`aliases` must be a map".into()).into());
            };
            for (alias, path) in aliases {
                set_alias(&alias, path.as_str())?;
            }
        }
        let id = match application.remove("id") {
            Some(Value::String(id)) => id,
            Some(_) => return Err(ConfigError::Malformed("`id` must be a string".into()).into()),
            None => DEFAULT_APPLICATION_ID.to_string(),
        };
        let bootstrap = match application.remove("bootstrap") {
            Some(Value::List(ids)) => ids
                .iter()
                .map(|id| {
                    id.as_str().map(str::to_string).ok_or_else(|| {
                        ConfigError::Malformed("`bootstrap` entries must be strings".into())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(ConfigError::Malformed("`bootstrap` must be a list".into()).into());
            }
            None => Vec::new(),
        };

        let class = ModuleClass::new(APPLICATION_CLASS);
        let module = Module::create(&id, Default::default(), &class, platform);
        module.set_default_route(DEFAULT_APPLICATION_ROUTE);
        module.configure(application)?;

        for component in &bootstrap {
            if module.get_component(component)?.is_none() {
                return Err(ConfigError::Malformed(format!(
                    "bootstrap component `{component}` is not declared"
                ))
                .into());
            }
        }

        tracing::info!(
            application = %id,
            platform = ?platform,
            base_path = ?get_alias("@app", false).ok().flatten(),
            "application created"
        );
        Ok(Self {
            module,
            context,
            platform,
        })
    }

    /// Build the application from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, JiiError> {
        Self::new(AppConfig::from_json_str(json)?)
    }

    /// The root module.
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// The application id.
    pub fn id(&self) -> String {
        self.module.id()
    }

    /// The platform variant.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The retained context configuration.
    pub fn context_config(&self) -> &Config {
        &self.context
    }

    /// Create a context from the retained configuration deep-merged with `config`.
    pub fn create_context(&self, config: Config) -> Result<Context, JiiError> {
        let merged = merge_configs([&self.context, &config]);
        Context::from_config(merged, self.platform)
    }

    /// Dispatch `route` with `context`.
    pub async fn run_action(&self, route: &str, context: &Context) -> Result<Dispatch, JiiError> {
        context.set_route(route);
        self.module.run_action(route, context).await
    }
}
