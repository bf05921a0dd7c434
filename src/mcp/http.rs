//! MCP over HTTP
//!
//! Each POST to the endpoint carries one JSON-RPC message and is answered
//! with one JSON body. Notifications get `202 Accepted` and no body. The
//! server never opens an event stream, so other methods are refused with
//! `405`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use log::{debug, info};
use tokio::net::TcpListener;

use crate::error::Result;

use super::server::McpServer;

/// Router answering MCP messages at `path`
pub fn router(server: McpServer, path: &str) -> Router {
    Router::new().route(path, post(handle_message)).with_state(server)
}

async fn handle_message(State(server): State<McpServer>, body: String) -> Response {
    match server.handle_line(&body).await {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => {
            debug!("Accepted notification over HTTP");
            StatusCode::ACCEPTED.into_response()
        }
    }
}

/// Bind `host:port` and serve until Ctrl-C
pub async fn serve_http(server: McpServer, host: &str, port: u16, path: &str) -> Result<()> {
    let listener = TcpListener::bind((host, port)).await?;
    serve_listener(server, listener, path).await
}

/// Serve on an already bound listener until Ctrl-C
pub async fn serve_listener(server: McpServer, listener: TcpListener, path: &str) -> Result<()> {
    info!(
        "Serving {} tools over HTTP at http://{}{} as {}",
        server.gateway().catalog().len(),
        listener.local_addr()?,
        path,
        server.name()
    );

    axum::serve(listener, router(server, path))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("HTTP server on {} stopped", path);
    Ok(())
}
