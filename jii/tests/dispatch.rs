mod common;

use async_trait::async_trait;
use common::{config, fresh_context, register_fixtures};
use jii::{
    Action, ActionFilter, AppConfig, Application, Component, Config, Context, Dispatch,
    HandlerSpec, JiiError, Module, Request, Response, Value,
};
use serde_json::json;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

fn application(application: serde_json::Value) -> Application {
    register_fixtures();
    Application::new(AppConfig {
        application: config(application),
        ..AppConfig::default()
    })
    .unwrap()
}

fn site_app() -> Application {
    application(json!({
        "controllerMap": {
            "site": "tests.SiteController",
            "error": "tests.ErrorController",
        },
    }))
}

// ============================================================================
// Route resolution
// ============================================================================

#[tokio::test]
async fn empty_route_resolves_like_default_route_and_default_action() {
    let app = site_app();
    for route in ["", "site", "site/index"] {
        let (context, journal, response) = fresh_context();
        let dispatch = app.run_action(route, &context).await.unwrap();
        assert_eq!(dispatch, Dispatch::Completed(Some("home".into())), "route {route:?}");
        assert_eq!(journal.entries(), vec!["site:actionIndex"]);
        assert_eq!(response.sent(), vec![Value::from("home")]);
    }
}

#[tokio::test]
async fn action_without_result_still_sends() {
    let app = site_app();
    let (context, _journal, response) = fresh_context();
    let dispatch = app.run_action("site/silent", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Completed(None));
    assert_eq!(response.send_count(), 1);
    assert_eq!(response.data(), None);
}

#[tokio::test]
async fn unresolved_routes_are_not_errors() {
    let app = site_app();
    let (context, journal, response) = fresh_context();
    let dispatch = app.run_action("nothing/here", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Unresolved);
    assert!(journal.entries().is_empty());
    assert!(!response.is_sent());
}

#[tokio::test]
async fn unknown_action_of_known_controller_is_an_invalid_route() {
    let app = site_app();
    let (context, _journal, response) = fresh_context();
    let err = app.run_action("site/missing", &context).await.unwrap_err();
    assert!(matches!(err, JiiError::InvalidRoute(_)));
    assert!(!response.is_sent());
}

#[tokio::test]
async fn derived_controller_names_reach_the_namespace() {
    let app = application(json!({"controllerNamespace": "tests.controllers"}));
    let (context, journal, _response) = fresh_context();
    let dispatch = app.run_action("post-comment", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Completed(Some("comments".into())));
    assert_eq!(journal.entries(), vec!["post-comment:actionIndex"]);

    let (context, journal, _response) = fresh_context();
    let dispatch = app.run_action("post-comment/preview", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Completed(Some("preview".into())));
    assert_eq!(journal.entries(), vec!["post-comment/preview"]);
}

#[tokio::test]
async fn derived_names_are_looked_up_in_the_controller_map() {
    let app = application(json!({
        "controllerMap": {"PostCommentController": "tests.controllers.PostCommentController"},
    }));
    let (context, _journal, _response) = fresh_context();
    let dispatch = app.run_action("post-comment/index", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Completed(Some("comments".into())));
}

#[tokio::test]
async fn partial_controller_declarations_inherit_the_class() {
    let app = site_app();
    app.module()
        .set_controller("site", config(json!({"title": "Welcome"})).into())
        .unwrap();
    let (context, _journal, _response) = fresh_context();
    let dispatch = app.run_action("site/title", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Completed(Some("Welcome".into())));
}

#[tokio::test]
async fn nested_modules_resolve_their_own_controllers() {
    let app = application(json!({
        "modules": {
            "admin": {
                "modules": {
                    "content": {"controllerMap": {"pages": "tests.SiteController"}},
                },
            },
        },
    }));
    let content = app.module().get_module("admin.content").unwrap().unwrap();
    let module_hooks = Arc::new(AtomicUsize::new(0));
    let counter = module_hooks.clone();
    content
        .on(
            "beforeAction afterAction",
            &HandlerSpec::function(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        )
        .unwrap();

    let (context, journal, _response) = fresh_context();
    let dispatch = app
        .run_action("admin/content/pages/index", &context)
        .await
        .unwrap();
    assert_eq!(dispatch, Dispatch::Completed(Some("home".into())));
    assert_eq!(journal.entries(), vec!["admin/content/pages:actionIndex"]);
    assert_eq!(module_hooks.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Hooks and cancellation
// ============================================================================

#[tokio::test]
async fn module_before_action_cancels_silently() {
    let app = site_app();
    app.module()
        .on(
            "beforeAction",
            &HandlerSpec::function(|event| {
                event.params.insert("isValid", false);
            }),
        )
        .unwrap();

    let (context, journal, response) = fresh_context();
    let dispatch = app.run_action("site/index", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Cancelled);
    assert!(journal.entries().is_empty());
    assert!(!response.is_sent());
}

#[tokio::test]
async fn hook_events_carry_the_action_id() {
    let app = site_app();
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = seen.clone();
    app.module()
        .on(
            "afterAction",
            &HandlerSpec::function(move |event| {
                if let Some(action) = event.params.get_str("action") {
                    sink.lock().push(action.to_string());
                }
            }),
        )
        .unwrap();

    let (context, _journal, _response) = fresh_context();
    app.run_action("site", &context).await.unwrap();
    assert_eq!(*seen.lock(), vec!["index".to_string()]);
}

struct Deny;

#[async_trait]
impl ActionFilter for Deny {
    async fn before_action(&self, action: &dyn Action, _context: &Context) -> Result<bool, JiiError> {
        Ok(action.id() != "index")
    }
}

#[tokio::test]
async fn filters_can_cancel_actions() {
    let app = site_app();
    app.module().add_filter(Deny);

    let (context, _journal, response) = fresh_context();
    assert_eq!(app.run_action("site/index", &context).await.unwrap(), Dispatch::Cancelled);
    assert!(!response.is_sent());

    let (context, _journal, response) = fresh_context();
    assert_eq!(
        app.run_action("site/silent", &context).await.unwrap(),
        Dispatch::Completed(None)
    );
    assert!(response.is_sent());
}

// ============================================================================
// Inline actions
// ============================================================================

#[tokio::test]
async fn inline_actions_bypass_controllers() {
    let app = site_app();
    app.module()
        .bind_fn("site", |_context| Box::pin(async { Ok(Some("inline".into())) }));

    let (context, journal, response) = fresh_context();
    let dispatch = app.run_action("site", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Completed(Some("inline".into())));
    assert!(journal.entries().is_empty());
    assert_eq!(response.sent(), vec![Value::from("inline")]);

    let (context, journal, _response) = fresh_context();
    app.run_action("site/silent", &context).await.unwrap();
    assert_eq!(journal.entries(), vec!["site:actionSilent"]);
}

#[tokio::test]
async fn inline_actions_see_the_request() {
    let app = application(json!({}));
    app.module().bind_fn("echo/name", |context| {
        Box::pin(async move {
            Ok(context
                .request()
                .and_then(|request| request.param("name")))
        })
    });

    let context = app
        .create_context(config(json!({"request": {"params": {"name": "jii"}}})))
        .unwrap();
    let dispatch = app.run_action("echo/name", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Completed(Some("jii".into())));
}

#[tokio::test]
async fn inline_actions_respect_the_module_hook() {
    let app = application(json!({}));
    app.module()
        .bind_fn("ping", |_context| Box::pin(async { Ok(Some("pong".into())) }));
    app.module()
        .on(
            "beforeAction",
            &HandlerSpec::function(|event| {
                event.params.insert("isValid", false);
            }),
        )
        .unwrap();

    let (context, _journal, response) = fresh_context();
    assert_eq!(app.run_action("ping", &context).await.unwrap(), Dispatch::Cancelled);
    assert!(!response.is_sent());
}

// ============================================================================
// Error route
// ============================================================================

#[tokio::test]
async fn error_route_runs_once_with_the_error_attached() {
    let app = site_app();
    app.module().set_error_route(Some("error/show"));

    let (context, journal, response) = fresh_context();
    let dispatch = app.run_action("site/fail", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Completed(Some("boom".into())));
    assert_eq!(journal.entries(), vec!["site:actionFail", "error:actionShow"]);
    assert_eq!(context.error().unwrap().to_string(), "boom");
    assert_eq!(response.sent(), vec![Value::from("boom")]);
}

#[tokio::test]
async fn failing_error_route_is_not_retried() {
    let app = site_app();
    app.module().set_error_route(Some("error/crash"));

    let (context, journal, response) = fresh_context();
    let err = app.run_action("site/fail", &context).await.unwrap_err();
    assert_eq!(err.to_string(), "error route failed");
    assert_eq!(journal.entries(), vec!["site:actionFail", "error:actionCrash"]);
    assert!(!response.is_sent());
}

#[tokio::test]
async fn errors_without_error_route_are_returned() {
    let app = site_app();
    let (context, _journal, _response) = fresh_context();
    let err = app.run_action("site/fail", &context).await.unwrap_err();
    assert!(matches!(err, JiiError::Custom(_)));
    assert!(context.error().is_none());
}

#[tokio::test]
async fn sub_modules_inherit_the_error_route() {
    let app = application(json!({
        "errorRoute": "error/show",
        "controllerMap": {"error": "tests.ErrorController"},
        "modules": {"shop": {"controllerMap": {"cart": "tests.SiteController"}}},
    }));
    let shop = app.module().get_module("shop").unwrap().unwrap();
    assert_eq!(shop.error_route().as_deref(), Some("error/show"));

    let (context, journal, _response) = fresh_context();
    let dispatch = app.run_action("shop/cart/fail", &context).await.unwrap();
    assert_eq!(dispatch, Dispatch::Completed(Some("boom".into())));
    assert_eq!(journal.entries(), vec!["shop/cart:actionFail", "error:actionShow"]);
}

#[tokio::test]
async fn modules_dispatch_without_an_application() {
    register_fixtures();
    let module = Module::new("standalone");
    module
        .configure(config(json!({
            "defaultRoute": "site",
            "controllerMap": {"site": "tests.SiteController"},
        })))
        .unwrap();

    let (context, _journal, _response) = fresh_context();
    assert_eq!(
        module.run_action("", &context).await.unwrap(),
        Dispatch::Completed(Some("home".into()))
    );
    assert!(context.route().is_empty());

    let context = Context::from_config(Config::new(), jii::Platform::Client).unwrap();
    assert_eq!(
        module.run_action("site", &context).await.unwrap(),
        Dispatch::Completed(Some("home".into()))
    );
}
