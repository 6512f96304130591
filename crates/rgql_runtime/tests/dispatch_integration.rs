//! Integration tests for request dispatch

mod common;

use common::{schema, EchoExecutor};
use rgql_runtime::{
    Context, ContextExt, HttpMethod, Request, ResponseEnvelope, Router, RouterConfig,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

fn router(executor: Arc<EchoExecutor>) -> Router {
    Router::new(RouterConfig::new("/api", schema(), executor)).unwrap()
}

async fn body_of(router: &Router, request: Request) -> Value {
    let envelope = router.dispatch(request).await.expect("route should match");
    assert!(!envelope.is_error(), "unexpected error: {envelope:?}");
    envelope.into_payload()
}

#[test]
fn test_route_table() {
    let router = router(Arc::new(EchoExecutor::default()));
    let routes: Vec<String> = router
        .routes()
        .iter()
        .map(|route| format!("{} {}", route.method, route.path))
        .collect();

    assert_eq!(
        routes,
        vec![
            "GET /users",
            "GET /user/:id",
            "GET /search",
            "GET /broken",
            "POST /add-user",
            "POST /delete-user",
            "POST /webhook",
            "POST /webhook/:id",
            "DELETE /webhook/:id",
        ]
    );
    assert_eq!(router.models(), ["User".to_string()]);
}

#[tokio::test]
async fn test_unhandled_requests() {
    let executor = Arc::new(EchoExecutor::default());
    let router = router(executor.clone());

    assert!(router.dispatch(Request::new("GET", "/other/users")).await.is_none());
    assert!(router.dispatch(Request::new("GET", "/api/nothing")).await.is_none());
    assert!(router.dispatch(Request::new("DELETE", "/api/users")).await.is_none());
    assert!(router.dispatch(Request::new("BREW", "/api/users")).await.is_none());
    assert!(router.dispatch(Request::new("GET", "/apiusers")).await.is_none());
    assert!(router.dispatch(Request::new("GET", "/api//user//42")).await.is_none());
    assert!(router.dispatch(Request::new("GET", "/api/user//42")).await.is_none());
    assert!(executor.executed.lock().unwrap().is_empty());

    assert!(router.handles("GET", "/api/user/1?x=1"));
    assert!(router.handles("POST", "/api/webhook"));
    assert!(!router.handles("GET", "/apiusers"));
    assert!(!router.handles("PATCH", "/api/users"));
}

#[tokio::test]
async fn test_lowercase_method_and_query_string() {
    let executor = Arc::new(EchoExecutor::default());
    let router = router(executor.clone());

    let body = body_of(&router, Request::new("get", "/api/users?limit=5")).await;
    assert_eq!(body, json!({"variables": {"limit": 5}}));
}

#[tokio::test]
async fn test_path_parameter_beats_query_string() {
    let executor = Arc::new(EchoExecutor::default());
    let router = router(executor.clone());

    let body = body_of(
        &router,
        Request::new("GET", "/api/user/1?id=2").with_body(json!({"id": "3"})),
    )
    .await;
    assert_eq!(body, json!({"variables": {"id": "1"}}));
}

#[tokio::test]
async fn test_boolean_and_list_coercion() {
    let executor = Arc::new(EchoExecutor::default());
    let router = router(executor.clone());

    body_of(
        &router,
        Request::new("GET", "/api/search?active=yes").with_body(json!({"tags": ["a", "b"]})),
    )
    .await;
    assert_eq!(
        executor.last_variables(),
        json!({"active": false, "tags": ["a", "b"]})
    );

    body_of(&router, Request::new("GET", "/api/search?active=true")).await;
    assert_eq!(executor.last_variables(), json!({"active": true}));
}

#[tokio::test]
async fn test_input_object_from_json_string() {
    let executor = Arc::new(EchoExecutor::default());
    let router = router(executor.clone());

    body_of(
        &router,
        Request::new("POST", "/api/add-user").with_body(json!({"input": "{\"name\":\"Ada\"}"})),
    )
    .await;
    assert_eq!(executor.last_variables(), json!({"input": {"name": "Ada"}}));
}

#[tokio::test]
async fn test_coercion_failure_is_an_execution_error() {
    let executor = Arc::new(EchoExecutor::default());
    let router = router(executor.clone());

    let envelope = router
        .dispatch(Request::new("GET", "/api/search").with_body(json!({"tags": "a,b"})))
        .await
        .unwrap();

    assert_eq!(envelope.status(), 500);
    assert_eq!(envelope.payload()["code"], "COERCION_ERROR");
    assert_eq!(envelope.payload()["extensions"]["variable"], "tags");
    assert!(executor.executed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_default_error_handler() {
    let router = router(Arc::new(EchoExecutor::default()));

    let envelope = router.dispatch(Request::new("GET", "/api/broken")).await.unwrap();
    assert_eq!(
        envelope,
        ResponseEnvelope::error(500, json!({"message": "boom"}))
    );
}

#[tokio::test]
async fn test_custom_error_handler() {
    let config = RouterConfig::new("/api", schema(), Arc::new(EchoExecutor::default()))
        .with_error_handler(|errors| {
            ResponseEnvelope::error(400, Value::Array(errors.to_vec())).with_status_message("Bad")
        });
    let router = Router::new(config).unwrap();

    let envelope = router.dispatch(Request::new("GET", "/api/broken")).await.unwrap();
    assert_eq!(envelope.status(), 400);
    assert_eq!(envelope.status_message(), Some("Bad"));
    assert_eq!(envelope.payload().as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_method_override_and_on_route() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);

    let executor = Arc::new(EchoExecutor::default());
    let config = RouterConfig::new("/api", schema(), executor.clone())
        .with_method("Mutation.deleteUser", HttpMethod::Delete)
        .with_on_route(move |info| {
            recorder
                .lock()
                .unwrap()
                .push(format!("{} {} {}", info.method, info.path, info.document.name));
        });
    let router = Router::new(config).unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 6);
    assert!(seen.contains(&"DELETE /delete-user deleteUser_mutation".to_string()));

    assert!(router.dispatch(Request::new("POST", "/api/delete-user")).await.is_none());
    let body = body_of(&router, Request::new("DELETE", "/api/delete-user?id=3")).await;
    assert_eq!(body, json!({"variables": {"id": "3"}}));
}

#[derive(Debug, PartialEq)]
struct Tenant(&'static str);

#[tokio::test]
async fn test_context_reaches_the_executor() {
    let executor = Arc::new(EchoExecutor::default());
    let router = router(executor.clone());

    let context = Context::new().with(Tenant("acme")).shared();
    body_of(
        &router,
        Request::new("GET", "/api/users").with_context(Arc::clone(&context)),
    )
    .await;

    let executed = executor.executed.lock().unwrap();
    assert!(Arc::ptr_eq(&executed[0].context, &context));
    assert_eq!(executed[0].context.get::<Tenant>(), Some(&Tenant("acme")));
}
