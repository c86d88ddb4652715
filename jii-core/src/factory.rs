//! # Object Factory
//!
//! Each product kind (`dyn Behavior`, `dyn Component`, ...) has a
//! [`Factory`]: a registry of [`Constructor`]s keyed by stable dotted type
//! names. Together the factories form the class registry that `className`
//! keys in configurations resolve against.
//!
//! ```rust,ignore
//! components().register(component_constructor::<Mailer>());
//!
//! let mailer = components().create(ObjectSpec::Config(
//!     Config::new()
//!         .with("className", "app.components.Mailer")
//!         .with("host", "localhost"),
//! ))?;
//! ```

use crate::{
    component::Component,
    error::{ConfigError, JiiError},
    identity::{TypeInfo, is_registered, register_lineage},
    object::{Object, configure},
    value::{CLASS_NAME_KEY, Config, Value},
};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{Arc, LazyLock, Weak},
};

/// Inputs handed to a constructor.
#[derive(Default)]
pub struct Setup {
    /// Positional constructor arguments.
    ///
    /// Only custom constructors read them. [`build_object`] and
    /// [`build_component`] reject a setup that carries any.
    pub args: Vec<Value>,
    /// Configuration left after removing `className`.
    pub config: Config,
    /// The object that will own the product.
    pub owner: Option<Weak<dyn Component>>,
}

impl Setup {
    /// Setup carrying only a configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the positional constructor arguments.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Set the owner.
    pub fn owned_by(mut self, owner: Weak<dyn Component>) -> Self {
        self.owner = Some(owner);
        self
    }
}

impl fmt::Debug for Setup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setup")
            .field("args", &self.args)
            .field("config", &self.config)
            .field("owned", &self.owner.is_some())
            .finish()
    }
}

type BuildFn<P> = dyn Fn(Setup) -> Result<Box<P>, JiiError> + Send + Sync;

/// A named way to build a `P`.
pub struct Constructor<P: ?Sized> {
    type_name: &'static str,
    parent: Option<&'static str>,
    build: Arc<BuildFn<P>>,
}

impl<P: ?Sized> Constructor<P> {
    /// Create a constructor.
    pub fn new<F>(type_name: &'static str, parent: Option<&'static str>, build: F) -> Self
    where
        F: Fn(Setup) -> Result<Box<P>, JiiError> + Send + Sync + 'static,
    {
        Self {
            type_name,
            parent,
            build: Arc::new(build),
        }
    }

    /// The type name the constructor is registered under.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The parent type name.
    pub fn parent(&self) -> Option<&'static str> {
        self.parent
    }

    /// Run the constructor.
    pub fn build(&self, setup: Setup) -> Result<Box<P>, JiiError> {
        (self.build)(setup)
    }
}

impl<P: ?Sized> Clone for Constructor<P> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            parent: self.parent,
            build: self.build.clone(),
        }
    }
}

impl<P: ?Sized> fmt::Debug for Constructor<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("type_name", &self.type_name)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

/// What to build.
pub enum ObjectSpec<P: ?Sized> {
    /// A constructor reference.
    Type(Constructor<P>),
    /// A registered type name.
    Class(String),
    /// A configuration whose `className` names the type.
    Config(Config),
}

impl<P: ?Sized> From<Constructor<P>> for ObjectSpec<P> {
    fn from(constructor: Constructor<P>) -> Self {
        ObjectSpec::Type(constructor)
    }
}

impl<P: ?Sized> From<&str> for ObjectSpec<P> {
    fn from(class: &str) -> Self {
        ObjectSpec::Class(class.to_string())
    }
}

impl<P: ?Sized> From<Config> for ObjectSpec<P> {
    fn from(config: Config) -> Self {
        ObjectSpec::Config(config)
    }
}

/// A registry of constructors for one product kind.
pub struct Factory<P: ?Sized> {
    kind: &'static str,
    constructors: RwLock<IndexMap<String, Constructor<P>>>,
}

impl<P: ?Sized> Factory<P> {
    /// Create an empty registry for products described as `kind`.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            constructors: RwLock::new(IndexMap::new()),
        }
    }

    /// The product kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register a constructor, replacing any previous one of the same name.
    ///
    /// The constructor's parent link is recorded in the lineage registry.
    pub fn register(&self, constructor: Constructor<P>) {
        register_lineage(constructor.type_name, constructor.parent);
        tracing::trace!(kind = self.kind, class = constructor.type_name, "class registered");
        self.constructors
            .write()
            .insert(constructor.type_name.to_string(), constructor);
    }

    /// Register a constructor under an additional name.
    pub fn register_as(&self, name: &str, constructor: Constructor<P>) {
        self.constructors.write().insert(name.to_string(), constructor);
    }

    /// Whether `class` is registered.
    pub fn contains(&self, class: &str) -> bool {
        self.constructors.read().contains_key(class)
    }

    /// Look up a constructor.
    pub fn get(&self, class: &str) -> Option<Constructor<P>> {
        self.constructors.read().get(class).cloned()
    }

    /// Look up a constructor, failing if `class` does not name one.
    pub fn resolve(&self, class: &str) -> Result<Constructor<P>, ConfigError> {
        self.get(class).ok_or_else(|| {
            if is_registered(class) {
                ConfigError::NotConstructible {
                    class: class.to_string(),
                    kind: self.kind,
                }
            } else {
                ConfigError::UnknownClass(class.to_string())
            }
        })
    }

    /// Build a product with an empty setup.
    pub fn create(&self, spec: ObjectSpec<P>) -> Result<Box<P>, JiiError> {
        self.create_with(spec, Setup::default())
    }

    /// Build a product.
    ///
    /// For [`ObjectSpec::Config`] the configuration (minus `className`) is
    /// merged in front of `setup.config`.
    pub fn create_with(&self, spec: ObjectSpec<P>, mut setup: Setup) -> Result<Box<P>, JiiError> {
        let constructor = match spec {
            ObjectSpec::Type(constructor) => constructor,
            ObjectSpec::Class(class) => self.resolve(&class)?,
            ObjectSpec::Config(mut config) => {
                let class = config
                    .take_class_name()?
                    .ok_or(ConfigError::MissingClassName)?;
                for (key, value) in std::mem::take(&mut setup.config) {
                    config.insert(key, value);
                }
                setup.config = config;
                self.resolve(&class)?
            }
        };
        tracing::trace!(kind = self.kind, class = constructor.type_name, "creating object");
        constructor.build(setup)
    }
}

impl<P> Factory<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    /// Build a shared product from a configuration value.
    ///
    /// A string names the class, a map is a configuration (its `className`
    /// defaulting to `default_class`), an object must already wrap an
    /// `Arc<P>`, and null yields `None`.
    pub fn create_from_value(
        &self,
        value: Value,
        default_class: Option<&str>,
        setup: Setup,
    ) -> Result<Option<Arc<P>>, JiiError> {
        let spec = match value {
            Value::Null => return Ok(None),
            Value::String(class) => ObjectSpec::Class(class),
            Value::Map(mut config) => {
                if config.class_name().is_none() {
                    if let Some(class) = default_class {
                        config.insert(CLASS_NAME_KEY, class);
                    }
                }
                ObjectSpec::Config(config)
            }
            Value::Object(instance) => {
                return instance.get::<P>().map(Some).ok_or_else(|| {
                    ConfigError::NotConstructible {
                        class: instance.type_name().to_string(),
                        kind: self.kind,
                    }
                    .into()
                });
            }
            other => {
                return Err(ConfigError::Malformed(format!(
                    "cannot build a {} from a {} value",
                    self.kind,
                    other.kind()
                ))
                .into());
            }
        };
        self.create_with(spec, setup).map(|product| Some(Arc::from(product)))
    }
}

impl<P: ?Sized> fmt::Debug for Factory<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("kind", &self.kind)
            .field("classes", &self.constructors.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Default-construct a plain object and apply its configuration.
pub fn build_object<T>(setup: Setup) -> Result<T, JiiError>
where
    T: Object + Default,
{
    let mut object = T::default();
    reject_args(object.type_name(), &setup.args)?;
    configure(&mut object, setup.config)?;
    Ok(object)
}

/// Default-construct a component, link its owner and apply its configuration.
pub fn build_component<T>(setup: Setup) -> Result<T, JiiError>
where
    T: Component + Default,
{
    let mut component = T::default();
    reject_args(component.type_name(), &setup.args)?;
    if let Some(owner) = setup.owner {
        component.component().set_owner(owner);
    }
    component.set_all(setup.config)?;
    Ok(component)
}

fn reject_args(type_name: &str, args: &[Value]) -> Result<(), ConfigError> {
    if args.is_empty() {
        return Ok(());
    }
    Err(ConfigError::Malformed(format!(
        "`{type_name}` takes no constructor arguments, got {}",
        args.len()
    )))
}

static COMPONENTS: LazyLock<Factory<dyn Component>> =
    LazyLock::new(|| Factory::new("component"));

/// The process-wide component class registry.
pub fn component_registry() -> &'static Factory<dyn Component> {
    &COMPONENTS
}

/// A constructor building `T` through [`build_component`].
pub fn component_constructor<T>() -> Constructor<dyn Component>
where
    T: Component + TypeInfo + Default,
{
    Constructor::new(T::TYPE_NAME, T::PARENT_TYPE_NAME, |setup| {
        Ok(Box::new(build_component::<T>(setup)?) as Box<dyn Component>)
    })
}

/// Register `T` in the component registry under its type name.
pub fn register_component<T>()
where
    T: Component + TypeInfo + Default,
{
    component_registry().register(component_constructor::<T>());
}
