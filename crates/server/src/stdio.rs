//! MCP over stdin/stdout.

use crate::handler::McpServer;
use nestwalk_core::error::{NestwalkError, NestwalkResult};
use rmcp::ServiceExt;

/// Serves until the client disconnects. Logging must not go to stdout.
pub async fn serve_stdio(server: McpServer) -> NestwalkResult<()> {
    tracing::info!("MCP server on stdio");

    let running = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| NestwalkError::Protocol(format!("MCP handshake failed: {e}")))?;
    let reason = running
        .waiting()
        .await
        .map_err(|e| NestwalkError::Internal(format!("MCP session task failed: {e}")))?;

    tracing::info!(?reason, "stdio session closed");
    Ok(())
}
