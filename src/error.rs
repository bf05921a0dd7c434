//! Error types for the memory gateway
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// Non-success response from the memory backend.
///
/// `detail` carries the backend's own message when it sent one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Backend error {status_code}: {detail}")]
pub struct BackendError {
    pub status_code: u16,
    pub detail: String,
}

impl BackendError {
    pub fn new(status_code: u16, detail: impl Into<String>) -> Self {
        Self {
            status_code,
            detail: detail.into(),
        }
    }
}

/// All error types that can occur in the gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Backend answered with a non-success status
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Timeout, redirect or body decoding failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend could not be reached at all
    #[error("Transport error: {0}")]
    Transport(String),

    /// Tool name not present in the catalog
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments rejected by the tool's parameter schema
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Tool table violates a contract invariant
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Configuration could not be loaded or applied
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Whether the failure came from talking to the backend, as opposed to
    /// the caller's request being rejected before any call was made.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            GatewayError::Backend(_) | GatewayError::Http(_) | GatewayError::Transport(_)
        )
    }

    /// Message shown to the agent for a failed tool call
    pub fn tool_message(&self) -> String {
        match self {
            GatewayError::Backend(e) => e.detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::new(404, "Memory not found");
        assert_eq!(err.to_string(), "Backend error 404: Memory not found");
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let err: GatewayError = BackendError::new(500, "boom").into();
        assert_eq!(err.to_string(), "Backend error 500: boom");
        assert!(err.is_backend_failure());
    }

    #[test]
    fn test_tool_message_uses_backend_detail() {
        let err: GatewayError = BackendError::new(400, "content is required").into();
        assert_eq!(err.tool_message(), "content is required");
    }

    #[test]
    fn test_transport_error_is_backend_failure() {
        let err = GatewayError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");
        assert!(err.is_backend_failure());
    }

    #[test]
    fn test_unknown_tool_error() {
        let err = GatewayError::UnknownTool("frobnicate".to_string());
        assert_eq!(err.to_string(), "Unknown tool: frobnicate");
        assert!(!err.is_backend_failure());
    }

    #[test]
    fn test_invalid_params_error() {
        let err = GatewayError::InvalidParams("limit must be <= 100".to_string());
        assert_eq!(err.to_string(), "Invalid params: limit must be <= 100");
        assert_eq!(err.tool_message(), "Invalid params: limit must be <= 100");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GatewayError = io_err.into();
        assert!(matches!(err, GatewayError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: GatewayError = json_err.into();
        assert!(matches!(err, GatewayError::Json(_)));
    }
}
