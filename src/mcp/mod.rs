//! MCP Layer - JSON-RPC 2.0 over stdio or HTTP
//!
//! This module provides:
//! - JSON-RPC message types with standard error codes
//! - McpServer, which exposes a ToolGateway as MCP tools
//! - An axum router carrying the same dispatch over HTTP

pub mod http;
pub mod messages;
pub mod server;

pub use messages::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use http::{router, serve_http, serve_listener};
pub use server::{DEFAULT_PROTOCOL_VERSION, McpServer};
