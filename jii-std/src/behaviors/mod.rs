//! Standard behaviors.

mod logging;

pub use logging::{LogLevel, LoggingBehavior};
