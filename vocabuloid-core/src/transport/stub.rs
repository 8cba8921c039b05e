//! Canned-response transport.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::{JsonObject, Transport, TransportError, kind_of};

#[derive(Debug, Clone)]
enum StubResponse {
    Json(Value),
    Empty,
    Fail(TransportError),
}

/// Transport that serves fixed responses per path and records every request.
///
/// Unknown paths answer with `Http { status: 404 }`. Routes can be replaced
/// while the stub is in use, which lets tests model a fetch that fails once
/// and succeeds later.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use vocabuloid_core::transport::StubTransport;
///
/// let stub = StubTransport::new()
///     .with_json("/users/7/lists.json", json!([]));
/// assert!(stub.requests().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, StubResponse>>,
    requests: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `path`.
    pub fn with_json(self, path: impl Into<String>, body: Value) -> Self {
        self.set_json(path, body);
        self
    }

    /// Serve an empty body at `path`.
    pub fn with_empty(self, path: impl Into<String>) -> Self {
        self.routes.lock().insert(path.into(), StubResponse::Empty);
        self
    }

    /// Fail every request to `path` with `error`.
    pub fn with_error(self, path: impl Into<String>, error: TransportError) -> Self {
        self.set_error(path, error);
        self
    }

    /// Wait this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the response at `path`.
    pub fn set_json(&self, path: impl Into<String>, body: Value) {
        self.routes.lock().insert(path.into(), StubResponse::Json(body));
    }

    /// Replace the response at `path` with a failure.
    pub fn set_error(&self, path: impl Into<String>, error: TransportError) {
        self.routes.lock().insert(path.into(), StubResponse::Fail(error));
    }

    /// Every requested path, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// How many times `path` was requested.
    pub fn request_count(&self, path: &str) -> usize {
        self.requests.lock().iter().filter(|p| *p == path).count()
    }

    async fn respond(&self, path: &str) -> Result<Option<Value>, TransportError> {
        self.requests.lock().push(path.to_string());
        tracing::trace!("stub GET {}", path);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.routes.lock().get(path).cloned();
        match response {
            Some(StubResponse::Json(Value::Null)) | Some(StubResponse::Empty) => Ok(None),
            Some(StubResponse::Json(value)) => Ok(Some(value)),
            Some(StubResponse::Fail(error)) => Err(error),
            None => Err(TransportError::Http { status: 404 }),
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn fetch_object(&self, path: &str) -> Result<Option<JsonObject>, TransportError> {
        match self.respond(path).await? {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(TransportError::MalformedBody {
                message: format!("expected a JSON object, got {}", kind_of(&other)),
            }),
        }
    }

    async fn fetch_collection(&self, path: &str) -> Result<Option<Vec<Value>>, TransportError> {
        match self.respond(path).await? {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(TransportError::MalformedBody {
                message: format!("expected a JSON array, got {}", kind_of(&other)),
            }),
        }
    }
}
