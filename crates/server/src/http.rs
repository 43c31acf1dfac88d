//! Axum-based HTTP transport.

use crate::handler::McpServer;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use nestwalk_core::error::{NestwalkError, NestwalkResult};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use serde_json::json;
use std::net::SocketAddr;

pub fn router(server: McpServer) -> Router {
    let factory = server.clone();
    let mcp = StreamableHttpService::new(
        move || Ok(factory.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    Router::new()
        .nest_service("/mcp", mcp)
        .route("/all-nested-groups/*group_id", get(nested_groups_endpoint))
        .route("/health", get(health))
        .with_state(server)
}

/// Binds `addr` and serves until the listener fails.
pub async fn serve(server: McpServer, addr: SocketAddr) -> NestwalkResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| NestwalkError::Config(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(%addr, "MCP server listening (streamable HTTP on /mcp)");

    axum::serve(listener, router(server))
        .await
        .map_err(|e| NestwalkError::Internal(format!("HTTP server failed: {e}")))
}

/// Plain JSON form of the resource, outside MCP framing.
async fn nested_groups_endpoint(
    State(server): State<McpServer>,
    Path(group_id): Path<String>,
) -> Response {
    let group_id = group_id.trim_start_matches('/');
    match server.resource().read_group(group_id).await {
        Ok(payload) => Json(payload).into_response(),
        Err(NestwalkError::Listing(e)) if e.is_not_found() => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        Err(NestwalkError::InvalidInput(msg)) => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn health() -> &'static str {
    "ok"
}
