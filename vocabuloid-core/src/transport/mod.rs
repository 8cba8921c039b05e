//! Access to the JSON REST service.
//!
//! This module provides:
//! - [`Transport`] - Trait the entity graph fetches through
//! - [`SignedTransport`] - OAuth-signed HTTP implementation
//! - [`StubTransport`] - Canned responses for tests and offline use
//!
//! An empty response body is not an error: both fetch operations return
//! `Ok(None)` for it, and callers treat that as "no data yet".

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

mod signed;
mod stub;

pub use signed::SignedTransport;
pub use stub::StubTransport;

/// A JSON object as returned by `fetch_object`.
pub type JsonObject = serde_json::Map<String, Value>;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No access token is stored, or the service rejected the signature.
    #[error("not authenticated")]
    Unauthenticated,

    /// The service could not be reached.
    #[error("network unavailable: {message}")]
    NetworkUnavailable { message: String },

    /// The service answered with a non-success status.
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// The body was not JSON of the expected shape.
    #[error("malformed response body: {message}")]
    MalformedBody { message: String },

    /// The credential store could not be read.
    #[error("credential store error: {message}")]
    Credentials { message: String },
}

/// GET access to service resources.
///
/// Paths are relative to the configured base URL and may carry a query
/// string, e.g. `/tenses.json?language_id=1`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch a resource whose body is a single JSON object.
    async fn fetch_object(&self, path: &str) -> Result<Option<JsonObject>, TransportError>;

    /// Fetch a resource whose body is a JSON array.
    async fn fetch_collection(&self, path: &str) -> Result<Option<Vec<Value>>, TransportError>;
}

/// Parse a body as a JSON object. Blank bodies and `null` yield `None`.
pub(crate) fn parse_object(body: &str) -> Result<Option<JsonObject>, TransportError> {
    match parse_value(body)? {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(TransportError::MalformedBody {
            message: format!("expected a JSON object, got {}", kind_of(&other)),
        }),
    }
}

/// Parse a body as a JSON array. Blank bodies and `null` yield `None`.
pub(crate) fn parse_collection(body: &str) -> Result<Option<Vec<Value>>, TransportError> {
    match parse_value(body)? {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(TransportError::MalformedBody {
            message: format!("expected a JSON array, got {}", kind_of(&other)),
        }),
    }
}

fn parse_value(body: &str) -> Result<Option<Value>, TransportError> {
    if body.trim().is_empty() {
        return Ok(None);
    }

    match serde_json::from_str(body) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(TransportError::MalformedBody {
            message: e.to_string(),
        }),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_null_bodies_are_absent() {
        assert_eq!(parse_object("").unwrap(), None);
        assert_eq!(parse_object("  \n").unwrap(), None);
        assert_eq!(parse_collection("null").unwrap(), None);
    }

    #[test]
    fn test_shape_mismatch_is_malformed() {
        assert!(matches!(
            parse_object("[1, 2]"),
            Err(TransportError::MalformedBody { .. })
        ));
        assert!(matches!(
            parse_collection("{\"a\": 1}"),
            Err(TransportError::MalformedBody { .. })
        ));
        assert!(matches!(
            parse_collection("{not json"),
            Err(TransportError::MalformedBody { .. })
        ));
    }

    #[test]
    fn test_parse_collection() {
        let items = parse_collection("[{\"vocabulary_list\": {\"id\": 3}}]")
            .unwrap()
            .unwrap();
        assert_eq!(items.len(), 1);
    }
}
