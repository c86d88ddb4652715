//! # jii-std
//!
//! Standard implementations for the Jii application framework.
//!
//! This crate provides:
//! - **Behaviors**: [`LoggingBehavior`](behaviors::LoggingBehavior), which
//!   logs selected component events through `tracing`
//! - **Testing utilities**: recording handlers and a counting behavior

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use jii_core;

// Modules
pub mod behaviors;
pub mod testing;

/// Register every behavior class of this crate in the behavior registry.
pub fn register_standard_classes() {
    jii_core::register_behavior::<behaviors::LoggingBehavior>();
    jii_core::register_behavior::<testing::CountingBehavior>();
}
