//! memory-gateway - MCP tool gateway for a knowledge-graph memory service
//!
//! Agents call tools; the gateway validates and shapes the arguments, makes one
//! REST call against the memory backend, renders the JSON reply as compact
//! text and prepends any pending notifications.

pub mod backend;
pub mod config;
pub mod error;
pub mod mcp;
pub mod notify;
pub mod render;
pub mod tools;

pub use backend::{Backend, HttpBackend, MockBackend};
pub use config::Config;
pub use error::{BackendError, GatewayError, Result};
pub use mcp::McpServer;
pub use notify::NotificationInjector;
pub use tools::{Surface, ToolCatalog, ToolGateway};
