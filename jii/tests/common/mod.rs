#![allow(dead_code)]

use async_trait::async_trait;
use jii::{
    Action, ActionCore, Component, ComponentCore, Config, Context, Controller, ControllerCore,
    Identifiable, JiiError, Member, MemoryResponse, Object, PropertyError, TypeInfo, Value,
};
use parking_lot::Mutex;
use std::sync::{Arc, Once};

// ============================================================================
// Journal
// ============================================================================

/// A context component recording what the actions did.
#[derive(Debug, Default)]
pub struct Journal {
    core: ComponentCore,
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl Identifiable for Journal {
    fn type_name(&self) -> &'static str {
        "tests.Journal"
    }
}

impl Object for Journal {}

impl Component for Journal {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

fn record(context: &Context, entry: &str) {
    if let Some(journal) = context.component_as::<Journal>("journal") {
        journal.push(entry);
    }
}

/// A context with a journal and an in-memory response.
pub fn fresh_context() -> (Context, Arc<Journal>, Arc<MemoryResponse>) {
    let context = Context::new();
    let journal = Arc::new(Journal::default());
    let response = Arc::new(MemoryResponse::new());
    context.set_component_instance("journal", journal.clone());
    context.set_response(response.clone());
    (context, journal, response)
}

// ============================================================================
// Controllers
// ============================================================================

/// `index` answers "home", `fail` errors, `silent` returns nothing and
/// `title` echoes the configured title.
#[derive(Default)]
pub struct SiteController {
    core: ComponentCore,
    controller: ControllerCore,
    title: String,
}

impl Identifiable for SiteController {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for SiteController {
    const TYPE_NAME: &'static str = "tests.SiteController";
}

impl Object for SiteController {
    fn member(&self, name: &str) -> Member {
        match name {
            "title" => Member::FIELD,
            "actionIndex" | "actionFail" | "actionSilent" | "actionTitle" => Member::METHOD,
            _ => Member::NONE,
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), JiiError> {
        match (name, value) {
            ("title", Value::String(title)) => {
                self.title = title;
                Ok(())
            }
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }

    fn get_member(&self, name: &str) -> Result<Value, JiiError> {
        match name {
            "title" => Ok(self.title.as_str().into()),
            _ => Err(PropertyError::unknown(Self::TYPE_NAME, name).into()),
        }
    }
}

impl Component for SiteController {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

#[async_trait]
impl Controller for SiteController {
    fn controller(&self) -> &ControllerCore {
        &self.controller
    }

    async fn run_method(&self, method: &str, context: &Context) -> Result<Option<Value>, JiiError> {
        record(context, &format!("{}:{method}", self.unique_id()));
        match method {
            "actionIndex" => Ok(Some("home".into())),
            "actionFail" => Err(JiiError::custom("boom")),
            "actionSilent" => Ok(None),
            "actionTitle" => Ok(Some(self.title.as_str().into())),
            _ => Err(JiiError::application(format!("no method {method}"))),
        }
    }
}

/// `show` answers the intercepted error message, `crash` errors again.
#[derive(Default)]
pub struct ErrorController {
    core: ComponentCore,
    controller: ControllerCore,
}

impl Identifiable for ErrorController {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for ErrorController {
    const TYPE_NAME: &'static str = "tests.ErrorController";
}

impl Object for ErrorController {
    fn member(&self, name: &str) -> Member {
        match name {
            "actionShow" | "actionCrash" => Member::METHOD,
            _ => Member::NONE,
        }
    }
}

impl Component for ErrorController {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

#[async_trait]
impl Controller for ErrorController {
    fn controller(&self) -> &ControllerCore {
        &self.controller
    }

    async fn run_method(&self, method: &str, context: &Context) -> Result<Option<Value>, JiiError> {
        record(context, &format!("{}:{method}", self.unique_id()));
        match method {
            "actionShow" => Ok(context.error().map(|err| Value::from(err.to_string()))),
            _ => Err(JiiError::custom("error route failed")),
        }
    }
}

/// Reached only through the derived class name of `post-comment`.
#[derive(Default)]
pub struct PostCommentController {
    core: ComponentCore,
    controller: ControllerCore,
}

impl Identifiable for PostCommentController {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for PostCommentController {
    const TYPE_NAME: &'static str = "tests.controllers.PostCommentController";
}

impl Object for PostCommentController {
    fn member(&self, name: &str) -> Member {
        match name {
            "actionIndex" => Member::METHOD,
            _ => Member::NONE,
        }
    }
}

impl Component for PostCommentController {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

#[async_trait]
impl Controller for PostCommentController {
    fn controller(&self) -> &ControllerCore {
        &self.controller
    }

    fn actions(&self) -> Config {
        Config::new().with("preview", "tests.PreviewAction")
    }

    async fn run_method(&self, method: &str, context: &Context) -> Result<Option<Value>, JiiError> {
        record(context, &format!("{}:{method}", self.unique_id()));
        Ok(Some("comments".into()))
    }
}

/// An external action answering "preview".
#[derive(Default)]
pub struct PreviewAction {
    core: ComponentCore,
    action: ActionCore,
}

impl Identifiable for PreviewAction {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }
}

impl TypeInfo for PreviewAction {
    const TYPE_NAME: &'static str = "tests.PreviewAction";
}

impl Object for PreviewAction {}

impl Component for PreviewAction {
    fn component(&self) -> &ComponentCore {
        &self.core
    }
}

#[async_trait]
impl Action for PreviewAction {
    fn action(&self) -> &ActionCore {
        &self.action
    }

    async fn run(&self, context: &Context) -> Result<Option<Value>, JiiError> {
        record(context, &self.unique_id());
        Ok(Some("preview".into()))
    }
}

/// Register the fixture classes once per test binary.
pub fn register_fixtures() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        jii::register_controller::<SiteController>();
        jii::register_controller::<ErrorController>();
        jii::register_controller::<PostCommentController>();
        jii::register_action::<PreviewAction>();
    });
}

/// Build a configuration from a JSON literal.
pub fn config(value: serde_json::Value) -> Config {
    Config::from_json(value).expect("valid configuration")
}
