//! Environment Configuration Loader
//!
//! Loads `KEY=VALUE` files into the process environment and gathers the
//! settings the `coda-agent` binary needs to build a provider and a tool set.
//!
//! ## Usage
//!
//! Call `load_environment()` early in main() before reading any settings:
//!
//! ```rust,no_run
//! use coda_core::config::{load_environment, AgentSettings};
//!
//! load_environment();
//! let settings = AgentSettings::from_env().expect("settings");
//! ```
//!
//! Library code never reads the environment; settings are passed in.

use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Paths to check (in order of priority)
pub const ENV_FILE_PATHS: &[&str] = &["/etc/coda/environment", ".env"];

pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_MAX_TOOL_HOPS: usize = 1;
pub const DEFAULT_TEST_TIMEOUT_SECS: u64 = 60;

/// Load environment variables from the first configuration file found.
///
/// `CODA_ENV_FILE` takes priority over [`ENV_FILE_PATHS`]. Variables that are
/// already set are never overridden.
///
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var("CODA_ENV_FILE") {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for (key, value) in parse_env_content(&content) {
                if std::env::var(&key).is_err() {
                    std::env::set_var(&key, &value);
                    loaded_count += 1;
                    debug!("Loaded: {}={}", key, if is_secret(&key) { "***" } else { value.as_str() });
                } else {
                    skipped_count += 1;
                    debug!("Skipped (already set): {}", key);
                }
            }

            info!(
                "Loaded {} environment variables from {} ({} skipped - already set)",
                loaded_count, path, skipped_count
            );

            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

fn is_secret(key: &str) -> bool {
    let upper = key.to_uppercase();
    upper.contains("KEY") || upper.contains("TOKEN") || upper.contains("SECRET")
}

/// Parse the body of an environment file, skipping comments and blank lines.
pub fn parse_env_content(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_env_line)
        .collect()
}

/// Parse a single environment line into key-value pair.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    // Handle: KEY=VALUE, KEY="VALUE", KEY='VALUE', export KEY=VALUE
    let line = line.strip_prefix("export ").unwrap_or(line);
    let mut parts = line.splitn(2, '=');
    let key = parts.next()?.trim();
    let value = parts.next()?.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get an optional configuration value.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Provider credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Settings read once at process start.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Lowercased provider name, `anthropic` or `gemini`
    pub provider: String,
    pub api_key: Option<ApiKey>,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub max_tool_hops: usize,
    /// Base directory for file tools
    pub workspace: Option<PathBuf>,
    pub test_command: Option<String>,
    pub test_timeout_secs: u64,
}

impl AgentSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(get_config_opt)
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = lookup("AI_PROVIDER")
            .map(|p| p.trim().to_lowercase())
            .unwrap_or_else(|| "anthropic".to_string());

        let key_vars: &[&str] = match provider.as_str() {
            "gemini" | "google" => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
            _ => &["code_editing_agent_api_key", "ANTHROPIC_API_KEY"],
        };
        let api_key = key_vars.iter().find_map(|var| lookup(var)).map(ApiKey::new);

        Ok(Self {
            provider,
            api_key,
            model: lookup("CODA_MODEL"),
            max_tokens: parse_number(&lookup, "CODA_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            max_tool_hops: parse_number(&lookup, "CODA_MAX_TOOL_HOPS", DEFAULT_MAX_TOOL_HOPS)?,
            workspace: lookup("CODA_WORKSPACE").map(PathBuf::from),
            test_command: lookup("CODA_TEST_COMMAND"),
            test_timeout_secs: parse_number(&lookup, "CODA_TEST_TIMEOUT_SECS", DEFAULT_TEST_TIMEOUT_SECS)?,
        })
    }

    /// The credential for the selected provider, or a configuration error.
    pub fn require_api_key(&self) -> Result<&ApiKey> {
        self.api_key.as_ref().ok_or_else(|| {
            let hint = match self.provider.as_str() {
                "gemini" | "google" => "GOOGLE_API_KEY",
                _ => "code_editing_agent_api_key",
            };
            Error::config(format!("no API key for provider '{}' (set {})", self.provider, hint))
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}
