//! Model Provider Traits and Types
//!
//! The orchestrator talks to every backend through [`ModelProvider`]. Wire
//! formats stay inside the adapters.

use async_trait::async_trait;
use coda_core::{ChatMessage, Result, ToolInvocation, ToolSpec};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Anthropic,
    Gemini,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Anthropic => write!(f, "anthropic"),
            ProviderType::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderType::Anthropic),
            "gemini" | "google" => Ok(ProviderType::Gemini),
            other => Err(format!("Unknown provider type: {}", other)),
        }
    }
}

/// One round-trip's worth of input. Built fresh for every call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// Full history snapshot, oldest first
    pub messages: Vec<ChatMessage>,
    pub system_prompt: String,
    /// `None` when no tools are offered; never `Some(vec![])`
    pub tools: Option<Vec<ToolSpec>>,
    pub max_output_tokens: u32,
}

impl ModelRequest {
    pub fn new(
        messages: Vec<ChatMessage>,
        system_prompt: impl Into<String>,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            messages,
            system_prompt: system_prompt.into(),
            tools: None,
            max_output_tokens,
        }
    }

    /// Offer tools. An empty list leaves `tools` unset.
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = if tools.is_empty() { None } else { Some(tools) };
        self
    }

    pub fn tool_count(&self) -> usize {
        self.tools.as_ref().map_or(0, Vec::len)
    }
}

/// What the model sent back for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Concatenated text blocks, possibly empty
    pub text_content: String,
    /// Tool calls in the order the model listed them
    pub tool_invocations: Vec<ToolInvocation>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text_content: text.into(),
            tool_invocations: Vec::new(),
        }
    }

    pub fn tool_use(invocations: Vec<ToolInvocation>) -> Self {
        Self {
            text_content: String::new(),
            tool_invocations: invocations,
        }
    }

    pub fn has_tool_use(&self) -> bool {
        !self.tool_invocations.is_empty()
    }
}

/// Shared provider for dynamic dispatch
pub type BoxedProvider = Arc<dyn ModelProvider>;

/// Model Provider trait
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send the request and translate the reply.
    ///
    /// Implementations must:
    /// 1. Send every message in `request.messages`
    /// 2. Report tool calls separately from text
    /// 3. Fail with `Error::Provider` on transport, HTTP or decoding errors
    async fn send_message(&self, request: ModelRequest) -> Result<ModelResponse>;

    /// Human-readable provider name
    fn provider_name(&self) -> &str;

    /// Model identifier sent to the backend
    fn model(&self) -> &str;

    /// Whether tool calls and their results can make a full round-trip
    fn supports_tool_calling(&self) -> bool {
        false
    }
}
