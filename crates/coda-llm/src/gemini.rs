//! Google Gemini API Client
//!
//! API key mode against `generativelanguage.googleapis.com`. The key travels
//! in the `x-goog-api-key` header.
//!
//! Tool round-trips are not wired up for this backend: requests never carry
//! function declarations and `functionCall` parts in a reply are dropped, so
//! responses never report tool use.

use anyhow::{Context, Result};
use async_trait::async_trait;
use coda_core::{Error, Role};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::provider::{ModelProvider, ModelRequest, ModelResponse};

// =============================================================================
// API ENDPOINT CONFIGURATION
// =============================================================================

/// Gemini API endpoints
pub mod endpoints {
    /// Google AI Studio (API key mode)
    pub const GOOGLE_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const GENERATE_CONTENT: &str = "generateContent";
}

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
pub const PROVIDER_NAME: &str = "Google Gemini";

// =============================================================================
// DATA STRUCTURES
// =============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(rename = "functionCall", default)]
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiFunctionCall {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason", default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: Option<u32>,
}

// =============================================================================
// TRANSLATION
// =============================================================================

fn build_request(request: &ModelRequest) -> GeminiRequest {
    let contents = request
        .messages
        .iter()
        .map(|m| GeminiContent {
            role: Some(
                match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }
                .to_string(),
            ),
            parts: vec![GeminiPart {
                text: m.content.clone(),
            }],
        })
        .collect();

    let system_instruction = Some(&request.system_prompt)
        .filter(|s| !s.is_empty())
        .map(|s| GeminiContent {
            role: None,
            parts: vec![GeminiPart { text: s.clone() }],
        });

    GeminiRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            max_output_tokens: request.max_output_tokens,
        },
    }
}

fn parse_response(response: GeminiResponse) -> Result<ModelResponse> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(anyhow::anyhow!("Gemini returned no answer: {}", reason));
    };

    let mut text = String::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            warn!(tool = %call.name, "Ignoring Gemini function call, tool round-trips are unsupported");
        }
    }

    debug!(finish_reason = ?candidate.finish_reason, "Gemini candidate");
    Ok(ModelResponse::text(text))
}

// =============================================================================
// CLIENT IMPLEMENTATION
// =============================================================================

/// Google Gemini Client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    /// Base API URL
    api_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client with API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_url: endpoints::GOOGLE_AI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create with custom endpoint
    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let mut client = Self::new(api_key);
        client.api_url = endpoint.into().trim_end_matches('/').to_string();
        client
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:{}",
            self.api_url,
            self.model,
            endpoints::GENERATE_CONTENT
        )
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let url = self.build_url();
        let gemini_req = build_request(request);

        debug!(url = %url, contents = gemini_req.contents.len(), "Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_req)
            .send()
            .await
            .context("Failed to send Gemini request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Gemini API error {}: {}", status, body));
        }

        let result: GeminiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        if let Some(usage) = &result.usage_metadata {
            debug!(
                prompt_tokens = ?usage.prompt_token_count,
                output_tokens = ?usage.candidates_token_count,
                "Gemini usage"
            );
        }

        parse_response(result)
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    async fn send_message(&self, request: ModelRequest) -> coda_core::Result<ModelResponse> {
        if request.tools.is_some() {
            warn!("Gemini adapter does not send tool declarations; ignoring tools");
        }
        info!("Gemini chat: model={}, messages={}", self.model, request.messages.len());
        self.generate(&request).await.map_err(|e| {
            error!(error = %format!("{:#}", e), "Gemini request failed");
            Error::provider(PROVIDER_NAME, e)
        })
    }

    fn provider_name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }
}
