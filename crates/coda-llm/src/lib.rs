//! coda-llm: Model Provider Port
//!
//! ## Supported Providers & Endpoints
//!
//! | Provider | Base URL | Auth Method | Tool calling |
//! |----------|----------|-------------|--------------|
//! | Anthropic | `https://api.anthropic.com/v1` | `x-api-key: {KEY}` | yes |
//! | Gemini | `https://generativelanguage.googleapis.com/v1beta` | `x-goog-api-key: {KEY}` | no |
//!
//! Both adapters send the whole conversation on every call and map any
//! transport, HTTP or decoding failure to [`coda_core::Error::Provider`].

pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod provider;

pub use anthropic::AnthropicClient;
pub use factory::create_provider;
pub use gemini::GeminiClient;
pub use provider::{BoxedProvider, ModelProvider, ModelRequest, ModelResponse, ProviderType};
