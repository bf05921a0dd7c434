//! HTTP implementation of the Backend trait
//!
//! One reqwest client is created on first use and shared by every call. Access
//! headers are attached once, as default headers of that client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::BackendConfig;
use crate::error::{BackendError, GatewayError, Result};

use super::{Backend, QueryParams};

/// Prefix added to every tool path
pub const API_PREFIX: &str = "/api";

/// Per-call correlation header
pub const SESSION_HEADER: &str = "X-Session-Id";

/// Fixed budget for every request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CLIENT_ID_HEADER: &str = "CF-Access-Client-Id";
const CLIENT_SECRET_HEADER: &str = "CF-Access-Client-Secret";

/// Backend client talking to the memory service over HTTP
pub struct HttpBackend {
    config: BackendConfig,
    connection: RwLock<Option<Client>>,
    connections_created: AtomicUsize,
}

impl HttpBackend {
    /// Create a backend; no connection is opened until the first call
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            connection: RwLock::new(None),
            connections_created: AtomicUsize::new(0),
        }
    }

    /// Full URL for a tool path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.config.base_url.trim_end_matches('/'), API_PREFIX, path)
    }

    /// Number of connections created so far
    pub fn connections_created(&self) -> usize {
        self.connections_created.load(Ordering::SeqCst)
    }

    /// Whether a live connection is currently held
    pub async fn is_connected(&self) -> bool {
        self.connection.read().await.is_some()
    }

    /// Drop the shared connection; the next call opens a new one
    pub async fn close(&self) {
        if self.connection.write().await.take().is_some() {
            debug!("Closed backend connection to {}", self.config.base_url);
        }
    }

    /// Shared connection, created on first use.
    ///
    /// Callers racing on a closed handle serialize on the write lock and
    /// re-check, so only one of them builds the client.
    pub async fn connection(&self) -> Result<Client> {
        if let Some(client) = self.connection.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.connection.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = self.build_client()?;
        self.connections_created.fetch_add(1, Ordering::SeqCst);
        info!("Opened backend connection to {}", self.config.base_url);
        *slot = Some(client.clone());
        Ok(client)
    }

    fn build_client(&self) -> Result<Client> {
        let mut headers = HeaderMap::new();
        match self.config.credentials() {
            Some((id, secret)) => {
                headers.insert(CLIENT_ID_HEADER, header_value(CLIENT_ID_HEADER, id)?);
                headers.insert(CLIENT_SECRET_HEADER, header_value(CLIENT_SECRET_HEADER, secret)?);
                let prefix: String = id.chars().take(12).collect();
                info!("Access headers configured (ID: {}...)", prefix);
            }
            None => {
                warn!(
                    "Access headers NOT configured - client_id {}, client_secret {}",
                    if self.config.client_id.is_empty() { "empty" } else { "set" },
                    if self.config.client_secret.is_empty() { "empty" } else { "set" },
                );
            }
        }

        Ok(Client::builder().default_headers(headers).timeout(REQUEST_TIMEOUT).build()?)
    }

    async fn send(&self, request: RequestBuilder, session_id: Option<&str>) -> Result<Value> {
        let request = match session_id.filter(|id| !id.is_empty()) {
            Some(id) => request.header(SESSION_HEADER, id),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_connect() {
                GatewayError::Transport(format!("Backend unreachable: {}", e))
            } else {
                GatewayError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(error_from_response(status, response).await.into());
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn post(&self, path: &str, body: &Value, session_id: Option<&str>) -> Result<Value> {
        debug!("POST {}", path);
        let client = self.connection().await?;
        self.send(client.post(self.url(path)).json(body), session_id).await
    }

    async fn get(&self, path: &str, params: &QueryParams, session_id: Option<&str>) -> Result<Value> {
        debug!("GET {} {:?}", path, params);
        let client = self.connection().await?;
        let mut request = client.get(self.url(path));
        if !params.is_empty() {
            request = request.query(params);
        }
        self.send(request, session_id).await
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| GatewayError::Config(format!("Invalid {} header: {}", name, e)))
}

async fn error_from_response(status: StatusCode, response: Response) -> BackendError {
    let text = response.text().await.unwrap_or_default();
    let detail = match extract_detail(&text) {
        Some(detail) => detail,
        None if !text.is_empty() => text,
        None => status.canonical_reason().unwrap_or("Unknown error").to_string(),
    };
    BackendError::new(status.as_u16(), detail)
}

/// Backend message from an error body: its `error` field, else `message`
pub fn extract_detail(body: &str) -> Option<String> {
    let data: Value = serde_json::from_str(body).ok()?;
    ["error", "message"].iter().find_map(|key| match data.get(*key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    })
}
