//! The outbound response contract.
//!
//! Dispatch stores an action's result with [`Response::set_data`] and then
//! calls [`Response::send`]. [`MemoryResponse`] keeps both observable.

use jii_core::{
    Component, ComponentCore, Constructor, Factory, Identifiable, JiiError, Member, Object,
    PropertyError, TypeInfo, Value, build_component,
};
use parking_lot::Mutex;
use std::sync::{
    LazyLock,
    atomic::{AtomicUsize, Ordering},
};

/// A response as seen by dispatch.
pub trait Response: Component {
    /// The data to be sent.
    fn data(&self) -> Option<Value>;

    /// Replace the data to be sent.
    fn set_data(&self, data: Value);

    /// Deliver the response.
    fn send(&self) -> Result<(), JiiError>;
}

/// A response that records what was sent.
#[derive(Debug)]
pub struct MemoryResponse {
    core: ComponentCore,
    status: Mutex<i64>,
    data: Mutex<Option<Value>>,
    sent: Mutex<Vec<Value>>,
    sends: AtomicUsize,
}

impl MemoryResponse {
    /// An empty response with status 200.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times the response was sent.
    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Whether the response was sent at least once.
    pub fn is_sent(&self) -> bool {
        self.send_count() > 0
    }

    /// The payloads delivered so far.
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().clone()
    }

    /// The status code.
    pub fn status(&self) -> i64 {
        *self.status.lock()
    }

    /// Set the status code.
    pub fn set_status(&self, status: i64) {
        *self.status.lock() = status;
    }
}

impl Default for MemoryResponse {
    fn default() -> Self {
        Self {
            core: ComponentCore::new(),
            status: Mutex::new(200),
            data: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            sends: AtomicUsize::new(0),
        }
    }
}

impl Identifiable for MemoryResponse {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for MemoryResponse {
    const TYPE_NAME: &'static str = "jii.response.MemoryResponse";
}

impl Object for MemoryResponse {
    fn member(&self, name: &str) -> Member {
        match name {
            "status" | "data" => Member::ACCESSOR,
            "send" => Member::METHOD,
            _ => Member::NONE,
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        match name {
            "status" => {
                let status = value
                    .as_i64()
                    .ok_or_else(|| PropertyError::invalid(Self::TYPE_NAME, name, "int"))?;
                self.set_status(status);
            }
            "data" => self.set_data(value),
            _ => return Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
        Ok(())
    }

    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        match name {
            "status" => Ok(self.status().into()),
            "data" => Ok(self.data().unwrap_or_default()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }
}

impl Component for MemoryResponse {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

impl Response for MemoryResponse {
    fn data(&self) -> Option<Value> {
        self.data.lock().clone()
    }

    fn set_data(&self, data: Value) {
        *self.data.lock() = Some(data);
    }

    fn send(&self) -> Result<(), JiiError> {
        let payload = self.data().unwrap_or_default();
        tracing::trace!(status = self.status(), "response sent");
        self.sent.lock().push(payload);
        self.sends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

static RESPONSES: LazyLock<Factory<dyn Response>> = LazyLock::new(|| {
    let factory = Factory::new("response");
    factory.register(response_constructor::<MemoryResponse>());
    factory
});

/// The process-wide response class registry.
pub fn response_registry() -> &'static Factory<dyn Response> {
    &RESPONSES
}

/// A constructor building `T` through [`build_component`].
pub fn response_constructor<T>() -> Constructor<dyn Response>
where
    T: Response + TypeInfo + Default,
{
    Constructor::new(T::TYPE_NAME, T::PARENT_TYPE_NAME, |setup| {
        Ok(Box::new(build_component::<T>(setup)?) as Box<dyn Response>)
    })
}

/// Register `T` in the response registry under its type name.
pub fn register_response<T>()
where
    T: Response + TypeInfo + Default,
{
    response_registry().register(response_constructor::<T>());
}
