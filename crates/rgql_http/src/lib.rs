//! HTTP/1 server for an rgql [`Router`].
//!
//! Requests the router does not handle get a JSON 404.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Incoming};
use hyper::ext::ReasonPhrase;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rgql_runtime::error::{ErrorCode, ResultExt, RgqlResult};
use rgql_runtime::{Context, ResponseEnvelope, Router};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Builds the context handed to the executor from the request head.
pub type ContextFactory = Arc<dyn Fn(&Parts) -> Context + Send + Sync>;

fn full<T: Into<Bytes>>(chunk: T) -> BoxBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

fn json_response(status: StatusCode, body: &Value) -> Response<BoxBody> {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"null".to_vec());
    let mut response = Response::new(full(bytes));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn not_found() -> Response<BoxBody> {
    json_response(StatusCode::NOT_FOUND, &serde_json::json!({"error": "Not Found"}))
}

fn bad_request(message: String) -> Response<BoxBody> {
    json_response(StatusCode::BAD_REQUEST, &serde_json::json!({"error": message}))
}

/// Writes a router envelope as an HTTP response.
pub fn envelope_response(envelope: ResponseEnvelope) -> Response<BoxBody> {
    let status =
        StatusCode::from_u16(envelope.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let reason = envelope
        .status_message()
        .and_then(|message| ReasonPhrase::try_from(message.as_bytes().to_vec()).ok());

    let mut response = json_response(status, envelope.payload());
    if let Some(reason) = reason {
        response.extensions_mut().insert(reason);
    }
    response
}

/// Serves REST calls through a shared router.
#[derive(Clone)]
pub struct RestService {
    router: Arc<Router>,
    context_factory: Option<ContextFactory>,
}

impl RestService {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            context_factory: None,
        }
    }

    /// Derives a context for every request, e.g. from its headers.
    #[must_use]
    pub fn with_context(
        mut self,
        factory: impl Fn(&Parts) -> Context + Send + Sync + 'static,
    ) -> Self {
        self.context_factory = Some(Arc::new(factory));
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Handles one request.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<BoxBody>
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
    {
        let (parts, body) = request.into_parts();

        let bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => return bad_request(format!("Cannot read body: {e}")),
        };
        let url = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);

        debug!("{} {}", parts.method, url);

        // Unrouted requests fall through to 404 whatever their body holds.
        if !self.router.handles(parts.method.as_str(), &url) {
            return not_found();
        }

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            match serde_json::from_slice(&bytes) {
                Ok(body) => body,
                Err(e) => return bad_request(format!("Invalid JSON: {e}")),
            }
        };

        let context = match &self.context_factory {
            Some(factory) => factory(&parts),
            None => Context::new(),
        };

        let request = rgql_runtime::Request::new(parts.method.as_str(), url)
            .with_body(body)
            .with_context(context.shared());

        match self.router.dispatch(request).await {
            Some(envelope) => envelope_response(envelope),
            None => not_found(),
        }
    }

    /// Binds `addr` and serves until the process exits.
    pub async fn serve(self, addr: SocketAddr) -> RgqlResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_rgql_err_with(ErrorCode::IoError, format!("Failed to bind {addr}"))?;
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    /// Serves connections until `shutdown` resolves, then stops every
    /// running subscription.
    pub async fn serve_with_shutdown(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> RgqlResult<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Listening on http://{}{}", addr, self.router.base_path());
        }

        tokio::pin!(shutdown);
        loop {
            let (stream, _peer) = tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => accepted.map_rgql_err(ErrorCode::IoError)?,
            };

            let io = TokioIo::new(stream);
            let service = self.clone();
            tokio::spawn(async move {
                let handler = service_fn(move |req: Request<Incoming>| {
                    let service = service.clone();
                    async move { Ok::<_, Infallible>(service.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, handler).await {
                    if !err.to_string().contains("connection closed") {
                        error!("Connection error: {:?}", err);
                    }
                }
            });
        }

        info!("Shutting down");
        self.router.shutdown().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_response() {
        let envelope = ResponseEnvelope::error(500, json!({"code": "NOT_FOUND"}))
            .with_status_message("Subscription failed to stop");
        let response = envelope_response(envelope);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let reason = response.extensions().get::<ReasonPhrase>().unwrap();
        assert_eq!(reason.as_bytes(), b"Subscription failed to stop");
    }

    #[test]
    fn test_invalid_status_falls_back_to_500() {
        let response = envelope_response(ResponseEnvelope::error(42, Value::Null));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
