//! Conversation Service
//!
//! Drives one user turn through the model and the tool registry:
//!
//! ```text
//! AwaitingInput -> RequestSent -> TextResolved
//!                              -> ToolsPending -> ToolsExecuted -> FollowUpSent -> ...
//! ```
//!
//! A tool round records one assistant note naming each tool and its output,
//! then one user turn carrying all results, so user and assistant turns keep
//! alternating. The number of tool rounds per call is capped by
//! [`ConversationConfig::max_tool_hops`]; a response that still asks for
//! tools after the cap is answered with its text and its calls are not run.
//!
//! History is never rolled back. A failed call leaves every turn recorded
//! before the failure in place.

use chrono::{DateTime, Utc};
use coda_core::config::{DEFAULT_MAX_TOKENS, DEFAULT_MAX_TOOL_HOPS};
use coda_core::{ConversationHistory, Error, Result, ToolSpec};
use coda_llm::{BoxedProvider, ModelRequest, ModelResponse};
use coda_tools::ToolRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::system_prompt::DEFAULT_SYSTEM_PROMPT;

/// Prefix of the synthetic user turn that carries tool output
pub const TOOL_RESULTS_PREFIX: &str = "Tool results: ";

/// Where the current `send_message` call is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingInput,
    RequestSent,
    ToolsPending,
    ToolsExecuted,
    FollowUpSent,
    TextResolved,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AwaitingInput => "awaiting_input",
            Phase::RequestSent => "request_sent",
            Phase::ToolsPending => "tools_pending",
            Phase::ToolsExecuted => "tools_executed",
            Phase::FollowUpSent => "follow_up_sent",
            Phase::TextResolved => "text_resolved",
        };
        f.write_str(name)
    }
}

/// Configuration for a conversation
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    pub system_prompt: String,
    pub max_output_tokens: u32,
    /// Tool rounds allowed per `send_message` call
    pub max_tool_hops: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_output_tokens: DEFAULT_MAX_TOKENS,
            max_tool_hops: DEFAULT_MAX_TOOL_HOPS,
        }
    }
}

/// One conversation: its history, a provider and a shared tool registry
pub struct ConversationService {
    provider: BoxedProvider,
    registry: Arc<ToolRegistry>,
    history: ConversationHistory,
    config: ConversationConfig,
    phase: Phase,
    session_id: String,
    started_at: DateTime<Utc>,
}

impl ConversationService {
    pub fn new(provider: BoxedProvider, registry: Arc<ToolRegistry>, config: ConversationConfig) -> Self {
        let session_id = Uuid::new_v4().to_string();
        info!(
            session = %session_id,
            provider = %provider.provider_name(),
            max_tool_hops = config.max_tool_hops,
            "Started conversation"
        );
        Self {
            provider,
            registry,
            history: ConversationHistory::new(),
            config,
            phase: Phase::AwaitingInput,
            session_id,
            started_at: Utc::now(),
        }
    }

    /// Conversation with no tools registered
    pub fn without_tools(provider: BoxedProvider, config: ConversationConfig) -> Self {
        Self::new(provider, Arc::new(ToolRegistry::new()), config)
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// Process one line of user input and return the model's final text.
    ///
    /// Provider failures on the first request are returned as they are.
    /// Failures during a tool round or its follow-up come back wrapped in
    /// [`Error::ToolRound`].
    pub async fn send_message(&mut self, user_input: &str) -> Result<String> {
        self.enter(Phase::AwaitingInput);
        self.history.append_user(user_input);

        let tools = self.offered_tools().await;
        let mut response = self.request(tools.clone(), Phase::RequestSent).await?;

        let mut hops = 0;
        while response.has_tool_use() {
            if hops >= self.config.max_tool_hops {
                warn!(
                    session = %self.session_id,
                    max_tool_hops = self.config.max_tool_hops,
                    requested = response.tool_invocations.len(),
                    "Tool hop limit reached; answering without running the requested tools"
                );
                break;
            }
            hops += 1;
            let follow_up_tools = if hops < self.config.max_tool_hops {
                tools.clone()
            } else {
                Vec::new()
            };
            response = self
                .tool_round(response, hops, follow_up_tools)
                .await
                .map_err(Error::tool_round)?;
        }

        Ok(self.resolve(response))
    }

    /// Tools to offer: none when the provider cannot complete a tool round-trip
    /// or when no tool hop is allowed.
    async fn offered_tools(&self) -> Vec<ToolSpec> {
        if self.config.max_tool_hops == 0 || !self.provider.supports_tool_calling() {
            return Vec::new();
        }
        self.registry.describe_all().await
    }

    async fn request(&mut self, tools: Vec<ToolSpec>, phase: Phase) -> Result<ModelResponse> {
        let request = ModelRequest::new(
            self.history.snapshot(),
            self.config.system_prompt.clone(),
            self.config.max_output_tokens,
        )
        .with_tools(tools);

        debug!(
            session = %self.session_id,
            messages = request.messages.len(),
            tools = request.tool_count(),
            "Sending model request"
        );
        self.enter(phase);
        let response = self.provider.send_message(request).await?;
        debug!(
            session = %self.session_id,
            text_len = response.text_content.len(),
            tool_calls = response.tool_invocations.len(),
            "Received model response"
        );
        Ok(response)
    }

    /// Run every requested tool in order, record the round, send the follow-up.
    async fn tool_round(
        &mut self,
        response: ModelResponse,
        hop: usize,
        follow_up_tools: Vec<ToolSpec>,
    ) -> Result<ModelResponse> {
        self.enter(Phase::ToolsPending);

        let mut notes = Vec::with_capacity(response.tool_invocations.len());
        let mut results = Vec::with_capacity(response.tool_invocations.len());
        for invocation in &response.tool_invocations {
            info!(
                session = %self.session_id,
                hop,
                tool = %invocation.tool_name,
                "Running requested tool"
            );
            let result = match self
                .registry
                .invoke(&invocation.tool_name, invocation.parameters.clone())
                .await
            {
                Ok(result) => result,
                Err(err) => {
                    // Tools that already ran may have changed files; keep their record.
                    if !notes.is_empty() {
                        warn!(
                            session = %self.session_id,
                            completed = notes.len(),
                            tool = %invocation.tool_name,
                            "Tool round aborted after partial execution"
                        );
                        self.history
                            .append_assistant(tool_note(&response.text_content, &notes));
                    }
                    return Err(err);
                }
            };
            notes.push(format!("Tool {} executed: {}", invocation.tool_name, result.text));
            results.push(result.into_text());
        }

        self.history
            .append_assistant(tool_note(&response.text_content, &notes));
        self.history
            .append_user(format!("{}{}", TOOL_RESULTS_PREFIX, results.join("\n")));
        self.enter(Phase::ToolsExecuted);

        self.request(follow_up_tools, Phase::FollowUpSent).await
    }

    fn resolve(&mut self, response: ModelResponse) -> String {
        let text = response.text_content;
        if !text.is_empty() {
            self.history.append_assistant(text.clone());
        }
        self.enter(Phase::TextResolved);
        text
    }

    fn enter(&mut self, phase: Phase) {
        debug!(session = %self.session_id, from = %self.phase, to = %phase, "Phase change");
        self.phase = phase;
    }
}

/// Assistant note for a tool round: any text the model sent, then one line per tool
fn tool_note(text: &str, notes: &[String]) -> String {
    let mut note = String::new();
    if !text.trim().is_empty() {
        note.push_str(text.trim_end());
        note.push('\n');
    }
    note.push_str(&notes.join("\n"));
    note
}
