//! Tool invocation
//!
//! One call is strictly sequential: shape the arguments, make one backend
//! request, render the reply, then prepend any pending notifications.

use std::sync::Arc;

use log::{debug, info};
use serde_json::{Map, Value};

use crate::backend::{Backend, HttpMethod};
use crate::error::{GatewayError, Result};
use crate::notify::NotificationInjector;
use crate::render::render;

use super::catalog::ToolCatalog;
use super::params::shape;

pub struct ToolGateway {
    catalog: ToolCatalog,
    backend: Arc<dyn Backend>,
    notifier: NotificationInjector,
    session_id: Option<String>,
}

impl ToolGateway {
    /// Build a gateway over a validated catalog
    pub fn new(catalog: ToolCatalog, backend: Arc<dyn Backend>) -> Result<Self> {
        catalog.validate()?;
        Ok(Self {
            catalog,
            notifier: NotificationInjector::new(backend.clone()),
            backend,
            session_id: None,
        })
    }

    /// Session id sent as `X-Session-Id` with every backend request
    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Invoke a tool and return its rendered text.
    ///
    /// `arguments` must be a JSON object or null. Argument problems fail with
    /// `UnknownTool`/`InvalidParams` before the backend is contacted; backend
    /// failures propagate unchanged.
    pub async fn call(&self, name: &str, arguments: &Value) -> Result<String> {
        let tool = self
            .catalog
            .get(name)
            .ok_or_else(|| GatewayError::UnknownTool(name.to_string()))?;

        let args = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(GatewayError::InvalidParams(format!(
                    "{}: arguments must be an object, got {}",
                    name, other
                )));
            }
        };

        let request = shape(tool, &args)?;
        let session_id = self.session_id();
        debug!("Calling {} -> {} {}", name, request.method, request.path);

        let data = match request.method {
            HttpMethod::Post => {
                self.backend
                    .post(&request.path, &Value::Object(request.body.clone()), session_id)
                    .await?
            }
            HttpMethod::Get => self.backend.get(&request.path, &request.query, session_id).await?,
        };

        if tool.contract.destructive && request.arguments.get("dry_run") == Some(&Value::Bool(false)) {
            info!("{} executed without dry run", name);
        }

        let text = render(tool.render, &data, &request.arguments);
        Ok(self.notifier.with_notifications(text, session_id).await)
    }
}

impl std::fmt::Debug for ToolGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolGateway")
            .field("tools", &self.catalog.len())
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::notify::NOTIFICATIONS_PATH;
    use crate::tools::Surface;
    use serde_json::json;

    fn gateway(mock: MockBackend) -> (ToolGateway, Arc<MockBackend>) {
        let mock = Arc::new(mock.with_response(NOTIFICATIONS_PATH, json!({"notifications": []})));
        let gateway = ToolGateway::new(ToolCatalog::for_surface(Surface::All), mock.clone()).unwrap();
        (gateway, mock)
    }

    #[tokio::test]
    async fn test_observe_round_trip() {
        let (gateway, mock) = gateway(MockBackend::new().with_response("/observe", json!({"id": "m1"})));

        let text = gateway
            .call("observe", &json!({"content": "Rates fall", "source": "fed"}))
            .await
            .unwrap();
        assert_eq!(text, "Stored [m1]\nRates fall");

        let calls = mock.calls_to("/observe");
        assert_eq!(calls[0].body, Some(json!({"content": "Rates fall", "source": "fed"})));
    }

    #[tokio::test]
    async fn test_draft_reply_names_next_step() {
        let (gateway, _) = gateway(MockBackend::new().with_response(
            "/observe",
            json!({
                "id": "m2",
                "status": "draft",
                "warnings": {"missing_fields": ["outcome_condition"], "reasoning": "time-bound"}
            }),
        ));

        let text = gateway
            .call("observe", &json!({"content": "CPI < 3% by June", "resolves_by": "2026-06-30"}))
            .await
            .unwrap();
        assert!(text.starts_with("Draft [m2] saved but not committed"));
        assert!(text.contains("Missing: outcome_condition"));
        assert!(text.contains("commit(memory_id=\"m2\")"));
    }

    #[tokio::test]
    async fn test_dry_run_previews_are_identical() {
        let (gateway, mock) = gateway(
            MockBackend::new().with_response("/admin/bulk-retract", json!({"would_retract": [{"id": "m1", "content": "x"}]})),
        );
        let args = json!({"memory_id": "m1", "reason": "bad source"});

        let first = gateway.call("bulk_retract", &args).await.unwrap();
        let second = gateway.call("bulk_retract", &args).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "Would retract 1 memories:\n  [m1] x");

        for call in mock.calls_to("/admin/bulk-retract") {
            let body = call.body.unwrap();
            assert_eq!(body["dry_run"], true);
            assert_eq!(body["cascade"], false);
        }
    }

    #[tokio::test]
    async fn test_get_route_with_path_and_query() {
        let (gateway, mock) = gateway(MockBackend::new().with_response(
            "/reference/m1",
            json!({"root": "m1", "nodes": [{"id": "m1", "content": "root"}], "edges": []}),
        ));

        let text = gateway
            .call("reference", &json!({"memory_id": "m1", "depth": 3}))
            .await
            .unwrap();
        assert_eq!(text, "[m1] root");

        let call = &mock.calls_to("/reference/m1")[0];
        assert_eq!(call.method, HttpMethod::Get);
        assert_eq!(
            call.query,
            vec![("direction".to_string(), "both".to_string()), ("depth".to_string(), "3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let (gateway, _) = gateway(MockBackend::new().with_error("/resolve", 409, "Memory already resolved"));

        let err = gateway
            .call("resolve", &json!({"memory_id": "m1", "outcome": "correct", "reason": "done"}))
            .await
            .unwrap_err();
        assert!(err.is_backend_failure());
        assert_eq!(err.tool_message(), "Memory already resolved");
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_reach_backend() {
        let (gateway, mock) = gateway(MockBackend::new());

        let err = gateway.call("find", &json!({"query": "x", "limit": 500})).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));

        let err = gateway.call("find", &json!(["x"])).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));

        let err = gateway.call("nope", &Value::Null).await.unwrap_err();
        assert!(matches!(err, GatewayError::UnknownTool(_)));

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_notifications_wrap_admin_tools() {
        let mock = Arc::new(
            MockBackend::new()
                .with_response("/admin/queue-purge", json!({"purged": 4, "dry_run": true}))
                .with_response(NOTIFICATIONS_PATH, json!({"notifications": [{"content": "m9 violated"}]})),
        );
        let gateway = ToolGateway::new(ToolCatalog::for_surface(Surface::Admin), mock).unwrap();

        let text = gateway
            .call("queue_purge", &json!({"mode": "dispatched_only"}))
            .await
            .unwrap();
        assert_eq!(text, "=== NOTIFICATIONS ===\n- m9 violated\nPurged 4 events (dry run)");
    }

    #[tokio::test]
    async fn test_session_id_forwarded() {
        let (gateway, mock) = gateway(MockBackend::new().with_response("/stats", json!({"total": 1})));
        let gateway = gateway.with_session_id(Some("sess-7".to_string()));

        gateway.call("stats", &json!({})).await.unwrap();
        for call in mock.calls() {
            assert_eq!(call.session_id.as_deref(), Some("sess-7"));
        }
    }

    #[test]
    fn test_rejects_invalid_catalog() {
        use crate::tools::{Route, Tool, ToolContract};

        let tool = Tool::new("wipe", "Delete", Route::post("/wipe")).with_contract(ToolContract::destructive());
        let result = ToolGateway::new(ToolCatalog::from_tools([tool]), Arc::new(MockBackend::new()));
        assert!(matches!(result, Err(GatewayError::Contract(_))));
    }
}
