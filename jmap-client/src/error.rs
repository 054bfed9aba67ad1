// jmap-client/src/error.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by the client. Each variant names the stage that failed.
#[derive(Debug, Error)]
pub enum JmapError {
    /// Identity material is missing; raised before any network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("session discovery failed: {0}")]
    Discovery(String),

    /// The session has no primary account for a required capability.
    #[error("server does not support capability {0}")]
    Capability(String),

    /// A batch could not be built (duplicate call id, dangling back-reference).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("batch request failed: {0}")]
    Protocol(String),

    /// A method call inside an otherwise successful batch returned an error object.
    #[error("{method} failed: {error}")]
    Method { method: String, error: MethodError },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("no sending identity available for account {0}")]
    NoIdentity(String),

    #[error("blob transfer failed: {0}")]
    Blob(String),

    #[error("push channel error: {0}")]
    Push(String),
}

impl JmapError {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

pub type Result<T, E = JmapError> = std::result::Result<T, E>;

/// Method-level error object (RFC 8620 Section 3.6.2).
///
/// Any fields beyond `type` and `description` are preserved in `extra`
/// so callers can show the server's error verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodError {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({})", self.type_, description),
            None => write!(f, "{}", self.type_),
        }
    }
}

/// Well-known method error types.
pub mod error_types {
    pub const UNKNOWN_METHOD: &str = "unknownMethod";
    pub const INVALID_ARGUMENTS: &str = "invalidArguments";
    pub const INVALID_RESULT_REFERENCE: &str = "invalidResultReference";
    pub const UNSUPPORTED_SORT: &str = "unsupportedSort";
    pub const ACCOUNT_NOT_FOUND: &str = "accountNotFound";
    pub const FORBIDDEN: &str = "forbidden";
    pub const SERVER_FAIL: &str = "serverFail";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_error_keeps_unknown_fields() {
        let err: MethodError = serde_json::from_value(json!({
            "type": "unsupportedSort",
            "description": "cannot sort by foo",
            "arguments": ["sort"]
        }))
        .unwrap();
        assert_eq!(err.type_, error_types::UNSUPPORTED_SORT);
        assert_eq!(err.extra.get("arguments"), Some(&json!(["sort"])));
        assert_eq!(err.to_string(), "unsupportedSort (cannot sort by foo)");
    }

    #[test]
    fn test_error_messages_name_the_stage() {
        let err = JmapError::not_found("mailbox", "Outbox");
        assert_eq!(err.to_string(), "mailbox not found: Outbox");

        let err = JmapError::Discovery("HTTP error 500: boom".to_string());
        assert!(err.to_string().starts_with("session discovery failed"));
    }
}
