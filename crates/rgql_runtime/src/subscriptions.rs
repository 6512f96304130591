//! Webhook-driven subscriptions.
//!
//! A subscriber registers a URL for one subscription root field. The manager
//! asks the executor for a result stream and spawns a push loop that POSTs
//! every result to that URL, in order, until the stream ends or the
//! subscriber stops it.
//!
//! ```text
//!           start                     stream ends / stop
//! [absent] -------> [active] -------------------------------> [absent]
//!                      |
//!                      +-- update: stop, then start with new variables
//! ```

use crate::coercion::{coerce_variables, ParamSources, QueryParams};
use crate::config::RouterConfig;
use crate::context::SharedContext;
use crate::error::{RgqlError, RgqlResult};
use crate::execution::{ExecutionRequest, ExecutionResult, Executor, ResultStream, SubscribeOutcome};
use crate::operation::{CompileRequest, OperationDocument, OperationKind};
use crate::routes::PathParams;
use crate::webhook::WebhookSender;
use futures::StreamExt;
use rgql_schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Body of `POST /webhook`.
#[derive(Debug, Clone, Deserialize)]
pub struct StartSubscription {
    pub subscription: String,
    #[serde(default)]
    pub variables: Value,
    pub url: String,
}

/// Body of `POST /webhook/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubscription {
    #[serde(default)]
    pub variables: Value,
}

/// What `start` and `update` return.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StartResult {
    /// A push loop is running under this id.
    Started { id: Uuid },
    /// The executor answered with a single result; nothing was registered.
    Immediate(ExecutionResult),
}

/// Response of `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoppedSubscription {
    pub id: Uuid,
}

struct SubscriptionClient {
    name: String,
    url: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

type ClientTable = Arc<RwLock<HashMap<Uuid, SubscriptionClient>>>;

/// Tracks active subscriptions and owns their push loops.
pub struct SubscriptionManager {
    schema: Arc<Schema>,
    executor: Arc<dyn Executor>,
    sender: Arc<dyn WebhookSender>,
    operations: HashMap<String, Arc<OperationDocument>>,
    clients: ClientTable,
}

impl SubscriptionManager {
    /// Compiles one operation per subscription root field.
    pub fn new(config: &RouterConfig, models: &[String]) -> RgqlResult<Self> {
        let mut operations = HashMap::new();

        if let Some(root) = config.schema.subscription_root() {
            for field in root.fields.values() {
                debug!("[Subscription] Creating {} operation", field.name);
                let document = config.operation_compiler.compile(&CompileRequest {
                    kind: OperationKind::Subscription,
                    field: &field.name,
                    schema: &config.schema,
                    models,
                    ignore: &config.ignore,
                    depth_limit: config.depth_limit,
                })?;
                operations.insert(field.name.clone(), Arc::new(document));
            }
        }

        Ok(Self {
            schema: Arc::clone(&config.schema),
            executor: Arc::clone(&config.executor),
            sender: Arc::clone(&config.webhook_sender),
            operations,
            clients: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Starts pushing results of `input.subscription` to `input.url`.
    pub async fn start(
        &self,
        input: StartSubscription,
        context: SharedContext,
    ) -> RgqlResult<StartResult> {
        let StartSubscription {
            subscription: name,
            variables,
            url,
        } = input;

        let document = self.operations.get(&name).cloned().ok_or_else(|| {
            RgqlError::not_found(format!("Subscription '{name}' is not available"))
        })?;

        let id = Uuid::new_v4();
        info!("[Subscription] Start {} with {}", id, name);

        let empty_path = PathParams::default();
        let empty_query = QueryParams::new();
        let variables = coerce_variables(
            &self.schema,
            &document,
            &ParamSources {
                path: &empty_path,
                query: &empty_query,
                body: &variables,
            },
        )?;

        let outcome = self
            .executor
            .subscribe(ExecutionRequest {
                document,
                variables,
                context,
            })
            .await;

        let stream = match outcome {
            SubscribeOutcome::Stream(stream) => stream,
            SubscribeOutcome::Immediate(result) => {
                debug!("[Subscription] {} returned an immediate result", name);
                return Ok(StartResult::Immediate(result));
            }
        };

        let cancel = CancellationToken::new();
        let mut clients = self.clients.write().await;
        let task = tokio::spawn(push_loop(
            id,
            url.clone(),
            stream,
            cancel.clone(),
            Arc::clone(&self.sender),
            Arc::clone(&self.clients),
        ));
        clients.insert(
            id,
            SubscriptionClient {
                name,
                url,
                cancel,
                task,
            },
        );

        Ok(StartResult::Started { id })
    }

    /// Stops a subscription and waits for its push loop to exit.
    ///
    /// A delivery still in flight is abandoned and the result stream is
    /// dropped before this returns.
    pub async fn stop(&self, id: Uuid) -> RgqlResult<StoppedSubscription> {
        info!("[Subscription] Stop {}", id);

        let client = self
            .clients
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| missing(id))?;
        client.cancel.cancel();
        join(id, client.task).await;

        Ok(StoppedSubscription { id })
    }

    /// Restarts a subscription with new variables.
    ///
    /// The restarted subscription gets a new id.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateSubscription,
        context: SharedContext,
    ) -> RgqlResult<StartResult> {
        info!("[Subscription] Update {}", id);

        let (name, url) = {
            let clients = self.clients.read().await;
            let client = clients.get(&id).ok_or_else(|| missing(id))?;
            (client.name.clone(), client.url.clone())
        };

        self.stop(id).await?;
        self.start(
            StartSubscription {
                subscription: name,
                variables: input.variables,
                url,
            },
            context,
        )
        .await
    }

    /// Cancels every push loop and waits for all of them to finish.
    pub async fn shutdown(&self) {
        let clients: Vec<(Uuid, SubscriptionClient)> =
            self.clients.write().await.drain().collect();

        for (_, client) in &clients {
            client.cancel.cancel();
        }
        for (id, client) in clients {
            join(id, client.task).await;
        }
    }

    /// Number of subscriptions with a running push loop.
    pub async fn active(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_active(&self, id: Uuid) -> bool {
        self.clients.read().await.contains_key(&id)
    }

    /// Names of the subscription fields that can be started.
    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}

/// Parses a subscription id taken from a URL.
pub fn parse_subscription_id(raw: &str) -> RgqlResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        RgqlError::not_found(format!("Subscription with ID '{raw}' does not exist"))
    })
}

fn missing(id: Uuid) -> RgqlError {
    RgqlError::not_found(format!("Subscription with ID '{id}' does not exist"))
}

async fn join(id: Uuid, task: JoinHandle<()>) {
    if let Err(err) = task.await {
        error!("[Subscription] Push loop {} failed: {}", id, err);
    }
}

async fn push_loop(
    id: Uuid,
    url: String,
    mut stream: ResultStream,
    cancel: CancellationToken,
    sender: Arc<dyn WebhookSender>,
    clients: ClientTable,
) {
    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            item = stream.next() => item,
        };
        let Some(result) = next else {
            break;
        };

        info!("[Subscription] Trigger {}", id);
        let delivered = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            delivered = sender.send(&url, &result) => delivered,
        };
        if let Err(err) = delivered {
            error!("[Subscription] Failed to send data to {}: {}", url, err);
        }
    }

    debug!("[Subscription] Push loop {} finished", id);
    clients.write().await.remove(&id);
}
