use serde_json::{json, Value};
use std::fmt;

/// Request-scoped failure kinds with their wire status mapping.
///
/// Every error a request can produce is funneled into one of these kinds and
/// mapped to a status exactly once, at the dispatcher boundary. Startup
/// problems (bad operation ids, unresolvable handlers) are not represented
/// here; those abort startup through `anyhow` before any request is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Role predicate failed (403).
    Authorization(String),
    /// Parameter or body representation mismatch (400).
    Binding(String),
    /// Unsupported marshal target shape for this request (500).
    Marshal(String),
    /// Handler exceeded the operation timeout (504).
    Timeout {
        operation_id: String,
        timeout_ms: u64,
    },
    /// Referenced entity absent, surfaced from the storage collaborator (404).
    NotFound(String),
    /// Any uncategorized handler failure (500). Message is surfaced, the
    /// backtrace is logged but never echoed to the client.
    Internal(String),
}

impl DispatchError {
    pub fn authorization(msg: impl Into<String>) -> Self {
        DispatchError::Authorization(msg.into())
    }

    pub fn binding(msg: impl Into<String>) -> Self {
        DispatchError::Binding(msg.into())
    }

    pub fn marshal(msg: impl Into<String>) -> Self {
        DispatchError::Marshal(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DispatchError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DispatchError::Internal(msg.into())
    }

    /// HTTP status this kind maps to.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::Authorization(_) => 403,
            DispatchError::Binding(_) => 400,
            DispatchError::Marshal(_) => 500,
            DispatchError::Timeout { .. } => 504,
            DispatchError::NotFound(_) => 404,
            DispatchError::Internal(_) => 500,
        }
    }

    /// JSON error body containing the human-readable message.
    #[must_use]
    pub fn to_body(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Authorization(msg) => write!(f, "{msg}"),
            DispatchError::Binding(msg) => write!(f, "{msg}"),
            DispatchError::Marshal(msg) => write!(f, "{msg}"),
            DispatchError::Timeout {
                operation_id,
                timeout_ms,
            } => write!(
                f,
                "Timed out waiting for response from {operation_id} after {timeout_ms} ms"
            ),
            DispatchError::NotFound(msg) => write!(f, "{msg}"),
            DispatchError::Internal(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<anyhow::Error> for DispatchError {
    fn from(err: anyhow::Error) -> Self {
        DispatchError::Internal(err.to_string())
    }
}
