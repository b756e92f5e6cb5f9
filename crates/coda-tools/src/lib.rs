//! coda-tools: Tool Registry and Execution
//!
//! Provides the [`Tool`] trait, the name-keyed [`ToolRegistry`], path policy
//! for file tools, and the built-in file and test tools.

pub mod builtin;
pub mod registry;
pub mod security;
pub mod tool;

// Re-export main types
pub use builtin::{BuiltinConfig, EditFileTool, ListFilesTool, ReadFileTool, RunTestsTool};
pub use registry::ToolRegistry;
pub use security::{PathPolicy, SecurityError};
pub use tool::{BoxedTool, SimpleTool, Tool};

/// Register all built-in tools
pub async fn register_builtin_tools(
    registry: &ToolRegistry,
    config: BuiltinConfig,
) -> coda_core::Result<()> {
    builtin::register_builtin_tools(registry, config).await
}
