//! Provider construction from already-loaded settings.

use std::sync::Arc;
use tracing::info;

use crate::anthropic::AnthropicClient;
use crate::gemini::GeminiClient;
use crate::provider::{BoxedProvider, ModelProvider, ProviderType};

/// Build a provider. `model` overrides the adapter's default model.
pub fn create_provider(
    provider_type: ProviderType,
    api_key: &str,
    model: Option<&str>,
) -> BoxedProvider {
    let provider: BoxedProvider = match provider_type {
        ProviderType::Anthropic => {
            let client = AnthropicClient::new(api_key);
            Arc::new(match model {
                Some(m) => client.with_model(m),
                None => client,
            })
        }
        ProviderType::Gemini => {
            let client = GeminiClient::new(api_key);
            Arc::new(match model {
                Some(m) => client.with_model(m),
                None => client,
            })
        }
    };

    info!(
        provider = %provider.provider_name(),
        model = %provider.model(),
        tool_calling = provider.supports_tool_calling(),
        "Created model provider"
    );
    provider
}
