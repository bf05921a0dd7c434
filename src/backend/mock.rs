//! Canned-response backend for tests and offline runs

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BackendError, GatewayError, Result};

use super::{Backend, HttpMethod, QueryParams};

/// What the mock answers for a path
#[derive(Debug, Clone)]
pub enum MockReply {
    Json(Value),
    Fail(BackendError),
    Unreachable,
}

/// A call the mock received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub query: QueryParams,
    pub session_id: Option<String>,
}

/// Backend returning predefined replies keyed by path
#[derive(Debug, Default)]
pub struct MockBackend {
    replies: HashMap<String, MockReply>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `path` with a JSON body
    pub fn with_response(mut self, path: &str, data: Value) -> Self {
        self.replies.insert(path.to_string(), MockReply::Json(data));
        self
    }

    /// Answer `path` with a non-success status
    pub fn with_error(mut self, path: &str, status_code: u16, detail: &str) -> Self {
        self.replies
            .insert(path.to_string(), MockReply::Fail(BackendError::new(status_code, detail)));
        self
    }

    /// Fail `path` as if the backend could not be reached
    pub fn with_unreachable(mut self, path: &str) -> Self {
        self.replies.insert(path.to_string(), MockReply::Unreachable);
        self
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Calls received for one path
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    fn reply(&self, call: RecordedCall) -> Result<Value> {
        let reply = self.replies.get(&call.path).cloned();
        let label = format!("{} {}", call.method, call.path);
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);

        match reply {
            Some(MockReply::Json(data)) => Ok(data),
            Some(MockReply::Fail(err)) => Err(err.into()),
            Some(MockReply::Unreachable) => Err(GatewayError::Transport(format!("Connection refused: {}", label))),
            None => Err(BackendError::new(404, format!("No mock response configured for {}", label)).into()),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn post(&self, path: &str, body: &Value, session_id: Option<&str>) -> Result<Value> {
        self.reply(RecordedCall {
            method: HttpMethod::Post,
            path: path.to_string(),
            body: Some(body.clone()),
            query: Vec::new(),
            session_id: session_id.map(String::from),
        })
    }

    async fn get(&self, path: &str, params: &QueryParams, session_id: Option<&str>) -> Result<Value> {
        self.reply(RecordedCall {
            method: HttpMethod::Get,
            path: path.to_string(),
            body: None,
            query: params.clone(),
            session_id: session_id.map(String::from),
        })
    }
}
