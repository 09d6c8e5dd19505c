//! API routes for the lorekeeper server

pub mod ingest;
pub mod query;
pub mod tools;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Questions
        .route("/ask", post(query::ask))
        .route("/agent", post(query::agent))
        .route("/agent/stream", post(query::agent_stream))
        // Tool surface
        .route("/tools", get(tools::list_tools))
        .route("/tools/call", post(tools::call_tool))
        // Ingestion
        .route("/ingest", post(ingest::ingest))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<Value> {
    let config = state.config();
    Json(json!({
        "name": "lorekeeper",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Campaign lore Q&A grounded in your Obsidian Portal notes",
        "llm": state.llm().model(),
        "embeddings": state.embedder().name(),
        "index": state.store().name(),
        "collection": config.vector_db.collection,
        "campaign": config.portal.campaign_id,
        "tools": state.tools().names(),
        "endpoints": {
            "POST /api/ask": "Single-shot answer from retrieved notes",
            "POST /api/agent": "Multi-turn agent exchange with tool calls",
            "POST /api/agent/stream": "Agent exchange as server-sent events",
            "GET /api/tools": "List tools and their argument schemas",
            "POST /api/tools/call": "Call a tool directly",
            "POST /api/ingest": "Rebuild the index from the campaign"
        }
    }))
}
