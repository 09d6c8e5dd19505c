//! Question endpoints: single-shot answers and the tool-calling agent

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::agent::{AgentEvent, NullSink, ToolContext};
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{AgentRequest, AgentResponse, Answer, AskRequest};

const MAX_TOP_K: usize = 50;

fn require_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(Error::invalid_request("question must not be empty"));
    }
    Ok(())
}

/// POST /api/ask - Single-shot grounded answer
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Answer>> {
    require_question(&request.question)?;
    tracing::info!("Question: \"{}\"", request.question);

    let top_k = request
        .top_k
        .unwrap_or(state.config().retrieval.top_k)
        .clamp(1, MAX_TOP_K);
    let answer = state
        .synthesizer()
        .answer(&request.question, top_k, request.include_gm_only)
        .await?;

    tracing::info!(
        "Answered in {}ms from {} chunks",
        answer.processing_time_ms,
        answer.chunks_retrieved
    );
    Ok(Json(answer))
}

/// POST /api/agent - One agent exchange, returned whole
pub async fn agent(
    State(state): State<AppState>,
    Json(request): Json<AgentRequest>,
) -> Result<Json<AgentResponse>> {
    require_question(&request.question)?;
    tracing::info!("Agent question: \"{}\"", request.question);

    let AgentRequest {
        question,
        mut history,
        include_gm_only,
    } = request;

    let outcome = state
        .agent()
        .run(
            &question,
            &mut history,
            &ToolContext::new(include_gm_only),
            &NullSink,
        )
        .await?;

    Ok(Json(outcome.into_response(history)))
}

fn sse_event(name: &str, payload: &impl Serialize) -> Event {
    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()))
}

/// POST /api/agent/stream - One agent exchange as server-sent events
///
/// Streams every agent event under its own name, then a final `done` event
/// carrying the full response (or an `error` event).
pub async fn agent_stream(
    State(state): State<AppState>,
    Json(request): Json<AgentRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    require_question(&request.question)?;
    tracing::info!("Streaming agent question: \"{}\"", request.question);

    let (tx, rx) = mpsc::unbounded_channel::<Event>();

    tokio::spawn(async move {
        let AgentRequest {
            question,
            mut history,
            include_gm_only,
        } = request;

        let events = tx.clone();
        let sink = move |event: AgentEvent| {
            let _ = events.send(sse_event(event.name(), &event));
        };

        let result = state
            .agent()
            .run(
                &question,
                &mut history,
                &ToolContext::new(include_gm_only),
                &sink,
            )
            .await;

        let last = match result {
            Ok(outcome) => sse_event("done", &outcome.into_response(history)),
            Err(e) => {
                tracing::error!("Agent stream failed: {}", e);
                sse_event(
                    "error",
                    &json!({"message": "Something went wrong while answering. Please try again."}),
                )
            }
        };
        let _ = tx.send(last);
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
