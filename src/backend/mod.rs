//! Backend Client Layer - REST access to the memory service
//!
//! This module provides:
//! - The Backend trait the gateway talks through
//! - HttpBackend, the reqwest implementation with a lazily created connection
//! - MockBackend, a canned-response backend for tests

pub mod client;
pub mod mock;

pub use client::{API_PREFIX, HttpBackend, REQUEST_TIMEOUT, SESSION_HEADER, extract_detail};
pub use mock::{MockBackend, MockReply, RecordedCall};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// HTTP verb a tool route uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// Query string pairs for GET requests
pub type QueryParams = Vec<(String, String)>;

/// REST access to the memory service. `path` excludes the `/api` prefix.
#[async_trait]
pub trait Backend: Send + Sync {
    /// POST a JSON body and return the parsed response
    async fn post(&self, path: &str, body: &Value, session_id: Option<&str>) -> Result<Value>;

    /// GET with query parameters and return the parsed response
    async fn get(&self, path: &str, params: &QueryParams, session_id: Option<&str>) -> Result<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_display() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }

    #[test]
    fn test_http_method_serialization() {
        assert_eq!(serde_json::to_string(&HttpMethod::Post).unwrap(), "\"POST\"");
    }
}
