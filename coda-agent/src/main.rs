//! coda-agent
//!
//! Front ends for the code-editing agent:
//! - `chat` (default): interactive console session
//! - `serve`: HTTP API around one shared conversation

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use coda_chat::system_prompt::load_system_prompt;
use coda_chat::{ConversationConfig, ConversationService};
use coda_core::config::{get_config_opt, AgentSettings};
use coda_llm::ProviderType;
use coda_tools::{BuiltinConfig, ToolRegistry};

mod console;
mod web;

#[derive(Parser, Debug)]
#[command(name = "coda-agent")]
#[command(about = "Conversational code-editing agent")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Model provider (anthropic or gemini)
    #[arg(long)]
    provider: Option<String>,

    /// Model identifier override
    #[arg(long)]
    model: Option<String>,

    /// Output token limit per request
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Tool rounds allowed per message
    #[arg(long)]
    max_tool_hops: Option<usize>,

    /// File holding the system prompt
    #[arg(long)]
    system_prompt_file: Option<PathBuf>,

    /// Base directory for the file tools
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Command run by the run_tests tool
    #[arg(long)]
    test_command: Option<String>,

    /// Timeout for the run_tests tool, in seconds
    #[arg(long)]
    test_timeout_secs: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Interactive console session
    Chat,
    /// Serve the chat API over HTTP
    Serve {
        /// Bind address (host:port)
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
}

impl Args {
    /// Flags as the environment keys they override
    fn overrides(&self) -> HashMap<&'static str, String> {
        let mut map = HashMap::new();
        if let Some(v) = &self.provider {
            map.insert("AI_PROVIDER", v.clone());
        }
        if let Some(v) = &self.model {
            map.insert("CODA_MODEL", v.clone());
        }
        if let Some(v) = self.max_tokens {
            map.insert("CODA_MAX_TOKENS", v.to_string());
        }
        if let Some(v) = self.max_tool_hops {
            map.insert("CODA_MAX_TOOL_HOPS", v.to_string());
        }
        if let Some(v) = &self.workspace {
            map.insert("CODA_WORKSPACE", v.display().to_string());
        }
        if let Some(v) = &self.test_command {
            map.insert("CODA_TEST_COMMAND", v.clone());
        }
        if let Some(v) = self.test_timeout_secs {
            map.insert("CODA_TEST_TIMEOUT_SECS", v.to_string());
        }
        map
    }

    fn settings(&self) -> Result<AgentSettings> {
        let overrides = self.overrides();
        let settings = AgentSettings::from_lookup(|key| {
            overrides.get(key).cloned().or_else(|| get_config_opt(key))
        })?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from /etc/coda/environment or .env (if present)
    let env_file = coda_core::config::load_environment();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coda_agent=info".parse()?)
                .add_directive("coda_chat=info".parse()?)
                .add_directive("coda_tools=info".parse()?)
                .add_directive("coda_llm=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    if let Some(path) = env_file {
        info!("Loaded environment from {}", path);
    }

    let args = Args::parse();
    let settings = args.settings()?;

    // --- 1. Tool Registry ---
    let mut builtin = BuiltinConfig::default();
    if let Some(dir) = &settings.workspace {
        builtin = builtin.with_workspace(dir.clone());
    }
    builtin.test_command = settings.test_command.clone();
    builtin.test_timeout = Duration::from_secs(settings.test_timeout_secs);

    let registry = Arc::new(ToolRegistry::new());
    coda_tools::register_builtin_tools(&registry, builtin).await?;
    info!("Initialized Tool Registry");

    // --- 2. Model Provider ---
    let provider_type: ProviderType = settings
        .provider
        .parse()
        .map_err(anyhow::Error::msg)?;
    let api_key = settings.require_api_key()?;
    let provider = coda_llm::create_provider(provider_type, api_key.expose(), settings.model.as_deref());

    // --- 3. Conversation ---
    let system_prompt = load_system_prompt(args.system_prompt_file.as_deref())
        .context("failed to load system prompt")?;
    let config = ConversationConfig {
        system_prompt,
        max_output_tokens: settings.max_tokens,
        max_tool_hops: settings.max_tool_hops,
    };
    let conversation = ConversationService::new(provider, registry, config);

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();
            console::run(conversation, stdin, stdout).await?;
        }
        Commands::Serve { bind } => {
            web::serve(conversation, &bind).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_environment_keys() {
        let args = Args::parse_from([
            "coda-agent",
            "--provider",
            "gemini",
            "--max-tool-hops",
            "3",
            "serve",
            "--bind",
            "0.0.0.0:9000",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.get("AI_PROVIDER").map(String::as_str), Some("gemini"));
        assert_eq!(overrides.get("CODA_MAX_TOOL_HOPS").map(String::as_str), Some("3"));
        assert!(!overrides.contains_key("CODA_MODEL"));
        assert!(matches!(args.command, Some(Commands::Serve { ref bind }) if bind == "0.0.0.0:9000"));
    }

    #[test]
    fn test_chat_is_the_default_command() {
        let args = Args::parse_from(["coda-agent"]);
        assert!(args.command.is_none());
        assert!(args.overrides().is_empty());
    }
}
