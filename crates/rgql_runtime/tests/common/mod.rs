//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use rgql_runtime::schema::{
    FieldDef, InputObjectDef, InputValueDef, ObjectDef, Schema, TypeRef,
};
use rgql_runtime::{
    ExecutionRequest, ExecutionResult, Executor, RgqlError, RgqlResult, SubscribeOutcome,
    WebhookSender,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Users, posts and a user subscription.
pub fn schema() -> Schema {
    let id = || TypeRef::non_null(TypeRef::named("ID"));
    Schema::builder()
        .query_type("Query")
        .mutation_type("Mutation")
        .subscription_type("Subscription")
        .object(
            ObjectDef::new("User")
                .field(FieldDef::new("id", id()))
                .field(FieldDef::new("name", TypeRef::named("String")))
                .field(FieldDef::new("posts", TypeRef::list(TypeRef::named("Post")))),
        )
        .object(
            ObjectDef::new("Post")
                .field(FieldDef::new("id", id()))
                .field(FieldDef::new("title", TypeRef::named("String")))
                .field(FieldDef::new("author", TypeRef::named("User"))),
        )
        .input_object(
            InputObjectDef::new("UserInput")
                .field(InputValueDef::new("name", TypeRef::named("String"))),
        )
        .object(
            ObjectDef::new("Query")
                .field(
                    FieldDef::new(
                        "users",
                        TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("User")))),
                    )
                    .argument("limit", TypeRef::named("Int")),
                )
                .field(FieldDef::new("user", TypeRef::named("User")).argument("id", id()))
                .field(
                    FieldDef::new("search", TypeRef::list(TypeRef::named("User")))
                        .argument("active", TypeRef::named("Boolean"))
                        .argument("tags", TypeRef::list(TypeRef::named("String"))),
                )
                .field(FieldDef::new("broken", TypeRef::named("String"))),
        )
        .object(
            ObjectDef::new("Mutation")
                .field(
                    FieldDef::new("addUser", TypeRef::named("User"))
                        .argument("input", TypeRef::non_null(TypeRef::named("UserInput"))),
                )
                .field(FieldDef::new("deleteUser", TypeRef::named("User")).argument("id", id())),
        )
        .object(
            ObjectDef::new("Subscription")
                .field(FieldDef::new("onUser", TypeRef::named("User")).argument("id", TypeRef::named("ID"))),
        )
        .build()
}

/// Echoes the coerced variables back under the root field and hands out
/// queued channels as subscription streams.
#[derive(Default)]
pub struct EchoExecutor {
    pub executed: Mutex<Vec<ExecutionRequest>>,
    pub subscribed: Mutex<Vec<ExecutionRequest>>,
    streams: Mutex<VecDeque<mpsc::UnboundedReceiver<ExecutionResult>>>,
}

impl EchoExecutor {
    /// Queues a stream for the next `subscribe` call and returns its sender.
    pub fn queue_stream(&self) -> mpsc::UnboundedSender<ExecutionResult> {
        let (tx, rx) = mpsc::unbounded();
        self.streams.lock().unwrap().push_back(rx);
        tx
    }

    pub fn last_variables(&self) -> Value {
        let executed = self.executed.lock().unwrap();
        executed
            .last()
            .map(|request| Value::Object(request.variables.clone()))
            .unwrap_or(Value::Null)
    }
}

#[async_trait]
impl Executor for EchoExecutor {
    async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let field = request.document.field_name.clone();
        let variables = Value::Object(request.variables.clone());
        self.executed.lock().unwrap().push(request);

        if field == "broken" {
            return ExecutionResult::errors(vec![
                json!({"message": "boom"}),
                json!({"message": "second"}),
            ]);
        }
        ExecutionResult::data(json!({ field: { "variables": variables } }))
    }

    async fn subscribe(&self, request: ExecutionRequest) -> SubscribeOutcome {
        self.subscribed.lock().unwrap().push(request);
        match self.streams.lock().unwrap().pop_front() {
            Some(rx) => SubscribeOutcome::Stream(rx.boxed()),
            None => SubscribeOutcome::Immediate(ExecutionResult::errors(vec![
                json!({"message": "subscriptions are closed"}),
            ])),
        }
    }
}

/// Records every push; URLs containing `fail` are rejected.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, ExecutionResult)>>,
    pub failures: Mutex<usize>,
}

impl RecordingSender {
    pub fn sent_to(&self, url: &str) -> Vec<Value> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(to, _)| to == url)
            .map(|(_, result)| result.data.clone().unwrap_or(Value::Null))
            .collect()
    }
}

#[async_trait]
impl WebhookSender for RecordingSender {
    async fn send(&self, url: &str, payload: &ExecutionResult) -> RgqlResult<()> {
        if url.contains("fail") {
            *self.failures.lock().unwrap() += 1;
            return Err(RgqlError::push(format!("{url} refused the connection")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((url.to_string(), payload.clone()));
        Ok(())
    }
}

/// Polls `check` until it holds or a second has passed.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
