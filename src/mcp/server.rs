//! MCP dispatch and the newline-delimited stdio transport
//!
//! Each request line is handled on its own task; responses funnel through
//! one writer so lines never interleave. Responses may come back in a
//! different order than the requests, matched by `id`.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::error::{GatewayError, Result};
use crate::tools::ToolGateway;

use super::messages::{JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse};

pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
pub const DEFAULT_SERVER_NAME: &str = "memory-gateway";

#[derive(Debug, Clone)]
pub struct McpServer {
    gateway: Arc<ToolGateway>,
    name: String,
}

impl McpServer {
    pub fn new(gateway: ToolGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
            name: DEFAULT_SERVER_NAME.to_string(),
        }
    }

    /// Name reported in `serverInfo`
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn gateway(&self) -> &ToolGateway {
        &self.gateway
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle one raw line; `None` when no response is due
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(format!("Parse error: {}", e)),
                ));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            )),
        }
    }

    /// Dispatch a parsed request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request(format!("Unsupported jsonrpc version: {}", request.jsonrpc)),
            ));
        }

        let Some(id) = request.id else {
            debug!("Notification: {}", request.method);
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result(&request.params)),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.tools_list_result()),
            "tools/call" => self.handle_tools_call(id, &request.params).await,
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        };
        Some(response)
    }

    fn initialize_result(&self, params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        json!({
            "protocolVersion": protocol_version,
            "serverInfo": {"name": self.name, "version": env!("CARGO_PKG_VERSION")},
            "capabilities": {"tools": {"listChanged": false}},
        })
    }

    fn tools_list_result(&self) -> Value {
        let tools: Vec<Value> = self.gateway.catalog().all().map(|t| t.to_mcp_descriptor()).collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, id: Value, params: &Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(id, JsonRpcError::invalid_params("tools/call requires a tool name"));
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.gateway.call(name, &arguments).await {
            Ok(text) => JsonRpcResponse::success(id, tool_result(text, false)),
            Err(e @ (GatewayError::UnknownTool(_) | GatewayError::InvalidParams(_))) => {
                JsonRpcResponse::error(id, JsonRpcError::invalid_params(e.to_string()))
            }
            Err(e) if e.is_backend_failure() => {
                warn!("Tool {} failed: {}", name, e);
                JsonRpcResponse::success(id, tool_result(format!("Error: {}", e.tool_message()), true))
            }
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        }
    }

    /// Serve until `reader` hits EOF and every in-flight request has answered
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let read_loop = async move {
            let mut lines = reader.lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                let server = self.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(response) = server.handle_line(&line).await {
                        let _ = tx.send(response);
                    }
                });
            }
            debug!("Input closed");
            Ok::<_, GatewayError>(())
        };

        let write_loop = async {
            while let Some(response) = rx.recv().await {
                let mut line = serde_json::to_string(&response)?;
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            Ok::<_, GatewayError>(())
        };

        let (read_result, write_result) = tokio::join!(read_loop, write_loop);
        read_result?;
        write_result?;
        Ok(writer)
    }

    /// Serve on the process's stdin/stdout
    pub async fn serve_stdio(&self) -> Result<()> {
        info!(
            "Serving {} tools over stdio as {}",
            self.gateway.catalog().len(),
            self.name
        );
        let stdin = BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await?;
        info!("Stdio closed, shutting down");
        Ok(())
    }
}

/// MCP `tools/call` result carrying one text block
fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "isError": is_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::mcp::messages::ErrorCode;
    use crate::notify::NOTIFICATIONS_PATH;
    use crate::tools::{Surface, ToolCatalog};

    fn server(mock: MockBackend, surface: Surface) -> McpServer {
        let mock = mock.with_response(NOTIFICATIONS_PATH, json!({"notifications": []}));
        let gateway = ToolGateway::new(ToolCatalog::for_surface(surface), Arc::new(mock)).unwrap();
        McpServer::new(gateway)
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(id, method, params)
    }

    #[tokio::test]
    async fn test_initialize_echoes_protocol_version() {
        let server = server(MockBackend::new(), Surface::User);

        let response = server
            .handle_request(request(1, "initialize", json!({"protocolVersion": "2025-03-26"})))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "memory-gateway");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);

        let response = server.handle_request(request(2, "initialize", json!({}))).await.unwrap();
        assert_eq!(response.result.unwrap()["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_tools_list_per_surface() {
        let server = server(MockBackend::new(), Surface::Admin);
        let response = server.handle_request(request(1, "tools/list", Value::Null)).await.unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        assert_eq!(tools.len(), 10);

        let purge = tools.iter().find(|t| t["name"] == "queue_purge").unwrap();
        assert_eq!(purge["annotations"]["destructiveHint"], true);
        assert_eq!(purge["inputSchema"]["properties"]["dry_run"]["default"], true);
        assert_eq!(purge["inputSchema"]["required"], json!(["mode"]));
    }

    #[tokio::test]
    async fn test_tools_call_success() {
        let server = server(
            MockBackend::new().with_response("/find", json!({"query": "x", "results": []})),
            Surface::User,
        );
        let response = server
            .handle_request(request(3, "tools/call", json!({"name": "find", "arguments": {"query": "x"}})))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["type"], "text");
        assert_eq!(result["content"][0]["text"], "No results for \"x\"");
    }

    #[tokio::test]
    async fn test_backend_failure_is_tool_error() {
        let server = server(MockBackend::new().with_error("/recall/m1", 404, "Memory not found"), Surface::User);
        let response = server
            .handle_request(request(4, "tools/call", json!({"name": "recall", "arguments": {"memory_id": "m1"}})))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "Error: Memory not found");
    }

    #[tokio::test]
    async fn test_unknown_tool_and_bad_params_are_rpc_errors() {
        let server = server(MockBackend::new(), Surface::User);

        let response = server
            .handle_request(request(5, "tools/call", json!({"name": "bulk_retract", "arguments": {}})))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::INVALID_PARAMS);

        let response = server
            .handle_request(request(6, "tools/call", json!({"name": "find", "arguments": {"limit": 3}})))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::INVALID_PARAMS);

        let response = server.handle_request(request(7, "tools/call", json!({}))).await.unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let server = server(MockBackend::new(), Surface::User);

        let response = server.handle_line("{not json").await.unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::PARSE_ERROR);
        assert_eq!(response.id, Value::Null);

        let response = server
            .handle_line(r#"{"jsonrpc":"1.0","id":9,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::INVALID_REQUEST);
        assert_eq!(response.id, json!(9));

        let response = server.handle_line(r#"{"jsonrpc":"2.0","id":10}"#).await.unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::INVALID_REQUEST);
        assert_eq!(response.id, json!(10));

        let response = server
            .handle_line(r#"{"jsonrpc":"2.0","id":11,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, ErrorCode::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let server = server(MockBackend::new(), Surface::User);
        assert!(
            server
                .handle_request(JsonRpcRequest::notification("notifications/initialized"))
                .await
                .is_none()
        );
        assert!(server.handle_request(JsonRpcRequest::notification("tools/list")).await.is_none());
    }

    #[tokio::test]
    async fn test_serve_answers_every_request_once() {
        let server = server(MockBackend::new().with_response("/stats", json!({"total": 2})), Surface::User);
        let input = [
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"stats"}}"#,
            r#"{"jsonrpc":"2.0","id":4,"method":"ping"}"#,
        ]
        .join("\n");

        let output = server.serve(input.as_bytes(), Vec::new()).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        let mut responses: Vec<JsonRpcResponse> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        responses.sort_by_key(|r| r.id.as_i64());

        assert_eq!(responses.len(), 4);
        let ids: Vec<i64> = responses.iter().filter_map(|r| r.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(responses.iter().all(JsonRpcResponse::is_success));
        assert_eq!(
            responses[2].result.as_ref().unwrap()["content"][0]["text"],
            "{\n  \"total\": 2\n}"
        );
    }
}
