//! Tool Registry
//!
//! Name-keyed lookup table from tool name to capability. One registry is
//! built at startup and shared read-mostly between conversations.
//!
//! Registration overwrites by name unless the registry is strict. Listing is
//! ordered by name so requests built from it are deterministic.

use coda_core::{Error, Result, ToolResult, ToolSpec};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::tool::BoxedTool;

/// Tool Registry
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<BTreeMap<String, BoxedTool>>,
    /// Reject duplicate names instead of replacing
    strict: bool,
}

impl ToolRegistry {
    /// Create a registry where the last registration for a name wins
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that rejects duplicate names
    pub fn strict() -> Self {
        Self {
            tools: RwLock::new(BTreeMap::new()),
            strict: true,
        }
    }

    /// Register a tool
    pub async fn register(&self, tool: BoxedTool) -> Result<()> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(Error::invalid_parameters("tool name cannot be empty"));
        }

        let mut tools = self.tools.write().await;
        if tools.contains_key(&name) {
            if self.strict {
                return Err(Error::DuplicateTool(name));
            }
            warn!(tool = %name, "Replacing previously registered tool");
        }
        tools.insert(name.clone(), tool);
        debug!("Registered tool: {}", name);
        Ok(())
    }

    /// Get a tool by name
    pub async fn get(&self, name: &str) -> Option<BoxedTool> {
        self.tools.read().await.get(name).cloned()
    }

    /// Tool descriptions, ordered by name
    pub async fn describe_all(&self) -> Vec<ToolSpec> {
        self.tools.read().await.values().map(|tool| tool.spec()).collect()
    }

    /// Registered tool names, ordered
    pub async fn names(&self) -> Vec<String> {
        self.tools.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }

    /// Route an invocation to the named tool.
    ///
    /// Fails only when no tool has that name; tool-level failures come back
    /// as error text inside the `ToolResult`.
    pub async fn invoke(&self, name: &str, parameters: Value) -> Result<ToolResult> {
        // Release the lock before running the tool.
        let tool = self
            .get(name)
            .await
            .ok_or_else(|| Error::unknown_tool(name))?;

        info!(tool = %name, "Executing tool");
        let result = tool.execute(parameters).await;
        if result.is_error {
            warn!(tool = %name, "Tool reported an error");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::SimpleTool;
    use serde_json::json;
    use std::sync::Arc;

    fn constant(name: &str, reply: &'static str) -> BoxedTool {
        Arc::new(SimpleTool::new(name, "constant", json!({"type": "object"}), move |_| {
            Ok(reply.to_string())
        }))
    }

    #[tokio::test]
    async fn test_register_and_invoke() {
        let registry = ToolRegistry::new();
        registry.register(constant("ping", "pong")).await.unwrap();

        let result = registry.invoke("ping", json!({})).await.unwrap();
        assert_eq!(result.text, "pong");
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let registry = ToolRegistry::new();
        registry.register(constant("ping", "first")).await.unwrap();
        registry.register(constant("ping", "second")).await.unwrap();

        assert_eq!(registry.len().await, 1);
        let result = registry.invoke("ping", Value::Null).await.unwrap();
        assert_eq!(result.text, "second");
    }

    #[tokio::test]
    async fn test_strict_rejects_duplicates() {
        let registry = ToolRegistry::strict();
        registry.register(constant("ping", "first")).await.unwrap();
        let err = registry.register(constant("ping", "second")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateTool(name) if name == "ping"));
    }

    #[tokio::test]
    async fn test_rejects_empty_name() {
        let registry = ToolRegistry::new();
        assert!(registry.register(constant(" ", "x")).await.is_err());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_tool_always_fails() {
        let empty = ToolRegistry::new();
        let err = empty.invoke("nonexistent_tool", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(_)));

        let populated = ToolRegistry::new();
        populated.register(constant("ping", "pong")).await.unwrap();
        let err = populated.invoke("nonexistent_tool", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "nonexistent_tool"));
    }

    #[tokio::test]
    async fn test_describe_all_is_sorted() {
        let registry = ToolRegistry::new();
        registry.register(constant("zeta", "")).await.unwrap();
        registry.register(constant("alpha", "")).await.unwrap();

        let names: Vec<String> = registry.describe_all().await.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(registry.describe_all().await, registry.describe_all().await);
    }

    #[tokio::test]
    async fn test_tool_errors_are_not_rewrapped() {
        let registry = ToolRegistry::new();
        registry
            .register(Arc::new(SimpleTool::new("fail", "fails", json!({"type": "object"}), |_| {
                Err(Error::tool_execution("File not found: x"))
            })))
            .await
            .unwrap();

        let result = tokio_test::assert_ok!(registry.invoke("fail", json!({})).await);
        assert!(result.is_error);
        assert_eq!(result.text, "Error: File not found: x");
    }
}
