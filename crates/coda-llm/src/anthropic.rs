//! Anthropic Claude API Client
//!
//! ## API Endpoints
//!
//! | Endpoint | URL | Purpose |
//! |----------|-----|--------|
//! | Base URL | `https://api.anthropic.com/v1` | All Claude APIs |
//! | Messages | `/messages` | Chat completions |
//!
//! ## Authentication
//! - Header: `x-api-key: {KEY}`
//! - Header: `anthropic-version: 2023-06-01`
//!
//! ## Tool Calling
//! Tools are sent in Anthropic's `input_schema` form. `tool_use` blocks in the
//! reply become [`ToolInvocation`]s, text blocks are concatenated.

use anyhow::{Context, Result};
use async_trait::async_trait;
use coda_core::{ChatMessage, Error, ToolInvocation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::provider::{ModelProvider, ModelRequest, ModelResponse};

// =============================================================================
// API ENDPOINT CONFIGURATION
// =============================================================================

pub mod endpoints {
    pub const BASE_URL: &str = "https://api.anthropic.com/v1";
    pub const MESSAGES: &str = "/messages";
    pub const API_VERSION: &str = "2023-06-01";
}

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
pub const PROVIDER_NAME: &str = "Anthropic Claude";

// =============================================================================
// DATA STRUCTURES
// =============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Tools available to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[allow(dead_code)]
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// =============================================================================
// TRANSLATION
// =============================================================================

fn build_request(model: &str, request: &ModelRequest) -> AnthropicRequest {
    let messages = request
        .messages
        .iter()
        .map(|m: &ChatMessage| AnthropicMessage {
            role: m.role.to_string(),
            content: m.content.clone(),
        })
        .collect();

    let system = Some(request.system_prompt.clone()).filter(|s| !s.is_empty());

    let tools = request
        .tools
        .as_ref()
        .map(|tools| tools.iter().map(|t| t.to_anthropic_format()).collect());

    AnthropicRequest {
        model: model.to_string(),
        messages,
        max_tokens: request.max_output_tokens,
        system,
        tools,
    }
}

fn parse_response(response: AnthropicResponse) -> ModelResponse {
    let mut text_parts = Vec::new();
    let mut tool_invocations = Vec::new();

    for block in response.content {
        match block {
            ResponseContentBlock::Text { text } => text_parts.push(text),
            ResponseContentBlock::ToolUse { name, input, .. } => {
                let parameters = if input.is_object() {
                    input
                } else {
                    Value::Object(Default::default())
                };
                tool_invocations.push(ToolInvocation::new(name, parameters));
            }
            ResponseContentBlock::Other => {}
        }
    }

    ModelResponse {
        text_content: text_parts.join(""),
        tool_invocations,
    }
}

// =============================================================================
// CLIENT IMPLEMENTATION
// =============================================================================

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_url: endpoints::BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let mut client = Self::new(api_key);
        client.api_url = endpoint.into().trim_end_matches('/').to_string();
        client
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn post_messages(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let url = format!("{}{}", self.api_url, endpoints::MESSAGES);
        let api_request = build_request(&self.model, request);

        debug!(
            url = %url,
            messages = api_request.messages.len(),
            tools = request.tool_count(),
            "Anthropic request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", endpoints::API_VERSION)
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .context("Failed to send Anthropic request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Anthropic API error {}: {}", status, body));
        }

        let result: AnthropicResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        if let Some(usage) = &result.usage {
            debug!(
                model = ?result.model,
                stop_reason = ?result.stop_reason,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Anthropic usage"
            );
        }

        Ok(parse_response(result))
    }
}

#[async_trait]
impl ModelProvider for AnthropicClient {
    async fn send_message(&self, request: ModelRequest) -> coda_core::Result<ModelResponse> {
        info!(
            "Anthropic chat: model={}, endpoint={}, tools={}",
            self.model,
            self.api_url,
            request.tool_count()
        );
        self.post_messages(&request).await.map_err(|e| {
            error!(error = %format!("{:#}", e), "Anthropic request failed");
            Error::provider(PROVIDER_NAME, e)
        })
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn supports_tool_calling(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coda_core::ToolSpec;
    use serde_json::json;

    fn request_with_tools() -> ModelRequest {
        ModelRequest::new(
            vec![
                ChatMessage::user("list files"),
                ChatMessage::assistant("Tool list_files executed: a.txt"),
                ChatMessage::user("Tool results: a.txt"),
            ],
            "Be helpful.",
            1024,
        )
        .with_tools(vec![ToolSpec::new(
            "list_files",
            "List a directory",
            json!({"type": "object", "properties": {}}),
        )])
    }

    #[test]
    fn test_build_request_sends_full_history() {
        let wire = serde_json::to_value(build_request(DEFAULT_MODEL, &request_with_tools())).unwrap();

        assert_eq!(wire["model"], DEFAULT_MODEL);
        assert_eq!(wire["max_tokens"], 1024);
        assert_eq!(wire["system"], "Be helpful.");
        assert_eq!(wire["messages"].as_array().unwrap().len(), 3);
        assert_eq!(wire["messages"][1]["role"], "assistant");
        assert_eq!(wire["messages"][2]["content"], "Tool results: a.txt");
        assert_eq!(wire["tools"][0]["name"], "list_files");
        assert_eq!(wire["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn test_build_request_omits_absent_tools() {
        let request = ModelRequest::new(vec![ChatMessage::user("hi")], "", 256);
        let wire = serde_json::to_value(build_request("m", &request)).unwrap();
        assert!(wire.get("tools").is_none());
        assert!(wire.get("system").is_none());
    }

    #[test]
    fn test_parse_response_separates_text_and_tools() {
        let raw = json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude",
            "content": [
                {"type": "text", "text": "Let me look. "},
                {"type": "tool_use", "id": "tu_1", "name": "read_file", "input": {"path": "a.txt"}},
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Done."},
                {"type": "tool_use", "id": "tu_2", "name": "list_files", "input": {}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        let response = parse_response(serde_json::from_value(raw).unwrap());

        assert_eq!(response.text_content, "Let me look. Done.");
        assert_eq!(
            response.tool_invocations,
            vec![
                ToolInvocation::new("read_file", json!({"path": "a.txt"})),
                ToolInvocation::new("list_files", json!({})),
            ]
        );
    }

    #[test]
    fn test_parse_text_only_response() {
        let raw = json!({"content": [{"type": "text", "text": "4"}]});
        let response = parse_response(serde_json::from_value(raw).unwrap());
        assert_eq!(response, ModelResponse::text("4"));
    }
}
