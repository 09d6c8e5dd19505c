//! Direct access to the agent's tools

use axum::{extract::State, Json};
use uuid::Uuid;

use crate::agent::{ToolContext, ToolOutput};
use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ToolCall, ToolCallRequest, ToolDefinition};

/// GET /api/tools - Registered tools with their argument schemas
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDefinition>> {
    Json(state.tools().definitions())
}

/// POST /api/tools/call - Invoke one tool
pub async fn call_tool(
    State(state): State<AppState>,
    Json(request): Json<ToolCallRequest>,
) -> Result<Json<ToolOutput>> {
    let call = ToolCall::new(
        format!("http_{}", Uuid::new_v4().simple()),
        request.name,
        request.arguments,
    );
    tracing::info!("Tool call over HTTP: {}", call.name);

    let output = state
        .tools()
        .dispatch(&call, &ToolContext::new(request.include_gm_only))
        .await?;
    Ok(Json(output))
}
