//! Logging behavior for event observation.

use jii_core::{
    Behavior, BehaviorCore, Event, Identifiable, JiiError, Member, Object, PropertyError,
    TypeInfo, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Severity used by [`LoggingBehavior`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// `tracing::trace!`
    Trace,
    /// `tracing::debug!`
    Debug,
    /// `tracing::info!`
    #[default]
    Info,
    /// `tracing::warn!`
    Warn,
}

impl LogLevel {
    fn parse(level: &str) -> Option<Self> {
        match level.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
        }
    }
}

/// A behavior that logs the configured events of its owner.
///
/// ```rust,ignore
/// component.attach_behavior("log", BehaviorSpec::Config(Config::from_json(json!({
///     "className": "jii.behaviors.LoggingBehavior",
///     "events": ["beforeAction", "afterAction"],
///     "level": "debug",
/// }))?))?;
/// ```
#[derive(Debug, Default)]
pub struct LoggingBehavior {
    core: BehaviorCore,
    events: Vec<String>,
    level: LogLevel,
    logged: AtomicUsize,
}

impl LoggingBehavior {
    /// Log `events` at `level`.
    pub fn new<I, S>(events: I, level: LogLevel) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            level,
            ..Self::default()
        }
    }

    /// How many events were logged.
    pub fn logged(&self) -> usize {
        self.logged.load(Ordering::Relaxed)
    }
}

impl Identifiable for LoggingBehavior {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for LoggingBehavior {
    const TYPE_NAME: &'static str = "jii.behaviors.LoggingBehavior";
}

impl Object for LoggingBehavior {
    fn member(&self, name: &str) -> Member {
        match name {
            "events" | "level" => Member::FIELD,
            _ => Member::NONE,
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        match name {
            "events" => {
                let items = value
                    .as_list()
                    .ok_or_else(|| PropertyError::invalid(Self::TYPE_NAME, name, "list of strings"))?;
                self.events = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            PropertyError::invalid(Self::TYPE_NAME, name, "list of strings")
                        })
                    })
                    .collect::<Result<_, _>>()?;
            }
            "level" => {
                self.level = value
                    .as_str()
                    .and_then(LogLevel::parse)
                    .ok_or_else(|| {
                        PropertyError::invalid(Self::TYPE_NAME, name, "trace, debug, info or warn")
                    })?;
            }
            _ => return Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
        Ok(())
    }

    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        match name {
            "events" => Ok(Value::List(
                self.events.iter().map(|e| Value::from(e.as_str())).collect(),
            )),
            "level" => Ok(self.level.as_str().into()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }
}

impl Behavior for LoggingBehavior {
    fn behavior(&self) -> &BehaviorCore {
        &self.core
    }

    fn events(&self) -> Vec<(String, String)> {
        self.events
            .iter()
            .map(|event| (event.clone(), "log".to_string()))
            .collect()
    }

    fn handle(&self, method: &str, event: &mut Event<'_>) -> bool {
        if method != "log" {
            return false;
        }
        self.logged.fetch_add(1, Ordering::Relaxed);
        let sender = event.sender.map(|s| s.type_name()).unwrap_or("-");
        let params = &event.params;
        match self.level {
            LogLevel::Trace => tracing::trace!(event = %event.name, sender, ?params, "component event"),
            LogLevel::Debug => tracing::debug!(event = %event.name, sender, ?params, "component event"),
            LogLevel::Info => tracing::info!(event = %event.name, sender, ?params, "component event"),
            LogLevel::Warn => tracing::warn!(event = %event.name, sender, ?params, "component event"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jii_core::{BehaviorSpec, Component, ComponentCore, Config};
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Default)]
    struct Widget {
        core: ComponentCore,
    }

    impl Identifiable for Widget {
        fn type_name(&self) -> &'static str {
            "logging.test.Widget"
        }
    }

    impl Object for Widget {}

    impl Component for Widget {
        fn component(&self) -> &ComponentCore {
            &self.core
        }
    }

    #[test]
    fn logs_only_configured_events() {
        let widget = Widget::default();
        let logger = Arc::new(LoggingBehavior::new(["save", "delete"], LogLevel::Debug));
        widget
            .attach_behavior("log", BehaviorSpec::Instance(logger.clone()))
            .unwrap();

        widget.emit("save");
        widget.emit("render");
        widget.emit("delete");
        assert_eq!(logger.logged(), 2);
    }

    #[test]
    fn built_from_configuration() {
        jii_core::register_behavior::<LoggingBehavior>();
        let config = Config::from_json(json!({
            "className": "jii.behaviors.LoggingBehavior",
            "events": ["open"],
            "level": "trace",
        }))
        .unwrap();

        let widget = Widget::default();
        widget
            .attach_behavior("log", BehaviorSpec::Config(config))
            .unwrap();
        widget.emit("open");

        let logger = widget.behavior_as::<LoggingBehavior>("log").unwrap();
        assert_eq!(logger.logged(), 1);
        assert_eq!(logger.level, LogLevel::Trace);
    }

    #[test]
    fn rejects_unknown_levels() {
        let mut logger = LoggingBehavior::default();
        assert!(logger.set_member("level", "loud".into()).is_err());
    }
}
