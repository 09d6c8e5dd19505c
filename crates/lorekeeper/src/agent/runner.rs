//! Multi-turn tool-calling loop

use futures::future::join_all;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::LlmProvider;
use crate::types::{AgentResponse, ChatDelta, ChatRequest, ChatResponse, History, Message, ToolCall};

use super::events::{AgentEvent, EventSink};
use super::tools::{ToolContext, ToolRegistry};

/// How an exchange ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// The model answered without requesting more tools
    Completed,
    /// The turn cap was hit while the model was still calling tools
    TurnLimitReached,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::TurnLimitReached => "turn_limit_reached",
        }
    }
}

/// Result of one exchange
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    pub status: AgentStatus,
    /// Final answer, or the last partial text when the cap was hit
    pub answer: Option<String>,
    /// Model turns used
    pub turns: usize,
    /// Tool calls executed
    pub tool_calls: usize,
}

impl AgentOutcome {
    pub fn into_response(self, history: History) -> AgentResponse {
        AgentResponse {
            status: self.status.as_str().to_string(),
            answer: self.answer,
            turns: self.turns,
            tool_calls: self.tool_calls,
            history,
        }
    }
}

/// Drives the model through tool calls until it answers or the cap is hit
///
/// Each exchange appends to the caller's history: the system instruction when
/// the history is empty, the user question, every tool-call request followed by
/// its results, and the final answer. A tool-call request and its results are
/// appended together, and only once every call of the turn succeeded, so a
/// failed exchange never leaves an unanswered request behind.
pub struct AgentRunner {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl AgentRunner {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self { llm, tools, config }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one exchange for `question`, continuing `history`
    pub async fn run(
        &self,
        question: &str,
        history: &mut History,
        ctx: &ToolContext,
        sink: &dyn EventSink,
    ) -> Result<AgentOutcome> {
        if history.is_empty() {
            history.push(Message::system(PromptBuilder::agent_system_prompt()));
        }
        history.push(Message::user(question));

        let mut tool_calls = 0;
        let mut partial: Option<String> = None;

        for turn in 1..=self.config.max_turns {
            sink.emit(AgentEvent::TurnStarted { turn });
            let response = self.model_turn(history, sink).await?;

            if response.tool_calls.is_empty() {
                let answer = response.content.trim().to_string();
                history.push(Message::assistant(answer.clone()));
                sink.emit(AgentEvent::FinalResult {
                    answer: answer.clone(),
                });
                tracing::info!(
                    "Agent answered after {} turns and {} tool calls",
                    turn,
                    tool_calls
                );
                return Ok(AgentOutcome {
                    status: AgentStatus::Completed,
                    answer: Some(answer),
                    turns: turn,
                    tool_calls,
                });
            }

            let results = self.execute_tools(&response.tool_calls, ctx, sink).await?;
            tool_calls += results.len();

            let text = response.content.trim();
            if !text.is_empty() {
                partial = Some(text.to_string());
            }
            history.push_tool_exchange(response.content, response.tool_calls, results);
        }

        let turns = self.config.max_turns;
        tracing::warn!(
            "Agent hit the turn limit ({}) after {} tool calls",
            turns,
            tool_calls
        );
        sink.emit(AgentEvent::TurnLimitReached {
            turns,
            partial: partial.clone(),
        });
        Ok(AgentOutcome {
            status: AgentStatus::TurnLimitReached,
            answer: partial,
            turns,
            tool_calls,
        })
    }

    /// Messages sent to the model, with the system instruction in front
    fn request_messages(history: &History) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        if !history.first().is_some_and(Message::is_system) {
            messages.push(Message::system(PromptBuilder::agent_system_prompt()));
        }
        messages.extend(history.messages().iter().cloned());
        messages
    }

    async fn model_turn(&self, history: &History, sink: &dyn EventSink) -> Result<ChatResponse> {
        let request = ChatRequest::new(Self::request_messages(history))
            .with_tools(self.tools.definitions())
            .with_temperature(self.config.temperature);

        let turn = async {
            let mut stream = self.llm.chat_stream(&request).await?;
            let mut response = ChatResponse::default();
            while let Some(delta) = stream.next().await {
                let delta = delta?;
                if let ChatDelta::Text(text) = &delta {
                    sink.emit(AgentEvent::TextDelta { text: text.clone() });
                }
                response.absorb(delta);
            }
            Ok::<_, Error>(response)
        };

        let secs = self.config.turn_timeout_secs;
        tokio::time::timeout(Duration::from_secs(secs), turn)
            .await
            .map_err(|_| Error::timeout(format!("{} turn", self.llm.name()), secs))?
    }

    /// Run every call of a turn concurrently; results come back in call order
    async fn execute_tools(
        &self,
        calls: &[ToolCall],
        ctx: &ToolContext,
        sink: &dyn EventSink,
    ) -> Result<Vec<Message>> {
        for call in calls {
            sink.emit(AgentEvent::ToolCallStarted { call: call.clone() });
        }

        let secs = self.config.tool_timeout_secs;
        let outputs = join_all(calls.iter().map(|call| async move {
            tokio::time::timeout(Duration::from_secs(secs), self.tools.dispatch(call, ctx))
                .await
                .map_err(|_| Error::timeout(format!("tool {}", call.name), secs))?
        }))
        .await;

        let mut results = Vec::with_capacity(calls.len());
        for (call, output) in calls.iter().zip(outputs) {
            let output = output?;
            sink.emit(AgentEvent::ToolCallResult {
                call_id: call.id.clone(),
                name: call.name.clone(),
                content: output.content.clone(),
                is_error: output.is_error,
            });
            let content = if output.is_error {
                format!("Error: {}", output.content)
            } else {
                output.content
            };
            results.push(Message::tool_result(call, content));
        }
        Ok(results)
    }
}
