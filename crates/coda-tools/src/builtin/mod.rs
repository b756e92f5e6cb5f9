//! Built-in Tools
//!
//! - **read_file**: read a text file
//! - **list_files**: list a directory
//! - **edit_file**: search-and-replace with a sibling backup
//! - **run_tests**: run the project's test command with a timeout
//!
//! File tools share one [`PathPolicy`].

mod edit_file;
mod list_files;
mod read_file;

pub use edit_file::EditFileTool;
pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;
pub use run_tests::{RunTestsTool, DEFAULT_MAX_OUTPUT, DEFAULT_TEST_TIMEOUT};

use crate::security::PathPolicy;
use crate::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Settings shared by the built-in tools
#[derive(Debug, Clone)]
pub struct BuiltinConfig {
    pub policy: PathPolicy,
    /// Shell command for `run_tests`; detected from the workspace when unset
    pub test_command: Option<String>,
    pub test_timeout: Duration,
    pub max_test_output: usize,
}

impl Default for BuiltinConfig {
    fn default() -> Self {
        Self {
            policy: PathPolicy::current_dir(),
            test_command: None,
            test_timeout: DEFAULT_TEST_TIMEOUT,
            max_test_output: DEFAULT_MAX_OUTPUT,
        }
    }
}

impl BuiltinConfig {
    pub fn with_workspace(mut self, dir: impl Into<std::path::PathBuf>) -> Self {
        self.policy = PathPolicy::new(dir);
        self
    }
}

/// Register all built-in tools with the registry
pub async fn register_builtin_tools(
    registry: &ToolRegistry,
    config: BuiltinConfig,
) -> coda_core::Result<()> {
    let policy = config.policy.clone();

    registry.register(Arc::new(ReadFileTool::new(policy.clone()))).await?;
    registry.register(Arc::new(ListFilesTool::new(policy.clone()))).await?;
    registry.register(Arc::new(EditFileTool::new(policy.clone()))).await?;
    registry
        .register(Arc::new(
            RunTestsTool::new(policy.base_dir())
                .with_command(config.test_command)
                .with_timeout(config.test_timeout)
                .with_max_output(config.max_test_output),
        ))
        .await?;

    info!(
        workspace = %policy.base_dir().display(),
        count = registry.len().await,
        "Registered built-in tools"
    );
    Ok(())
}
