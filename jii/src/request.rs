//! The inbound request contract.
//!
//! The transport layer is out of scope. A request only has to answer
//! parameter lookups by key. [`MemoryRequest`] serves them from a configured
//! map.

use jii_core::{
    Component, ComponentCore, Config, Constructor, Factory, Identifiable, JiiError, Member,
    Object, PropertyError, TypeInfo, Value, build_component,
};
use std::sync::LazyLock;

/// A request as seen by actions.
pub trait Request: Component {
    /// Look up a request parameter.
    fn param(&self, key: &str) -> Option<Value>;
}

/// A request backed by an in-memory parameter map.
#[derive(Debug, Default)]
pub struct MemoryRequest {
    core: ComponentCore,
    params: Config,
}

impl MemoryRequest {
    /// A request carrying `params`.
    pub fn new(params: Config) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }
}

impl Identifiable for MemoryRequest {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for MemoryRequest {
    const TYPE_NAME: &'static str = "jii.request.MemoryRequest";
}

impl Object for MemoryRequest {
    fn member(&self, name: &str) -> Member {
        match name {
            "params" => Member::FIELD,
            _ => Member::NONE,
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        match (name, value) {
            ("params", Value::Map(params)) => {
                self.params = params;
                Ok(())
            }
            ("params", _) => Err(PropertyError::invalid(Self::TYPE_NAME, name, "map").into()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }

    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        match name {
            "params" => Ok(self.params.clone().into()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }
}

impl Component for MemoryRequest {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

impl Request for MemoryRequest {
    fn param(&self, key: &str) -> Option<Value> {
        self.params.get(key).cloned()
    }
}

static REQUESTS: LazyLock<Factory<dyn Request>> = LazyLock::new(|| {
    let factory = Factory::new("request");
    factory.register(request_constructor::<MemoryRequest>());
    factory
});

/// The process-wide request class registry.
pub fn request_registry() -> &'static Factory<dyn Request> {
    &REQUESTS
}

/// A constructor building `T` through [`build_component`].
pub fn request_constructor<T>() -> Constructor<dyn Request>
where
    T: Request + TypeInfo + Default,
{
    Constructor::new(T::TYPE_NAME, T::PARENT_TYPE_NAME, |setup| {
        Ok(Box::new(build_component::<T>(setup)?) as Box<dyn Request>)
    })
}

/// Register `T` in the request registry under its type name.
pub fn register_request<T>()
where
    T: Request + TypeInfo + Default,
{
    request_registry().register(request_constructor::<T>());
}
