//! Error types for coda

use thiserror::Error;

/// Main error type for coda operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Path not allowed for security reasons: {0}")]
    PathNotAllowed(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("{provider} provider error: {message}")]
    Provider { provider: String, message: String },

    #[error("Tool round failed: {0}")]
    ToolRound(#[source] Box<Error>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an invalid parameters error
    pub fn invalid_parameters(msg: impl Into<String>) -> Self {
        Error::InvalidParameters(msg.into())
    }

    /// Create a tool execution error
    pub fn tool_execution(msg: impl Into<String>) -> Self {
        Error::ToolExecution(msg.into())
    }

    /// Create a path policy error
    pub fn path_not_allowed(path: impl Into<String>) -> Self {
        Error::PathNotAllowed(path.into())
    }

    /// Create an unknown tool error
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Error::UnknownTool(name.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a provider error, keeping the full context chain of the cause.
    pub fn provider(provider: impl Into<String>, err: impl Into<anyhow::Error>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: format!("{:#}", err.into()),
        }
    }

    /// Wrap a failure that happened after the first model response.
    pub fn tool_round(err: Error) -> Self {
        match err {
            Error::ToolRound(_) => err,
            other => Error::ToolRound(Box::new(other)),
        }
    }

    pub fn is_provider(&self) -> bool {
        match self {
            Error::Provider { .. } => true,
            Error::ToolRound(inner) => inner.is_provider(),
            _ => false,
        }
    }

    pub fn is_unknown_tool(&self) -> bool {
        match self {
            Error::UnknownTool(_) => true,
            Error::ToolRound(inner) => inner.is_unknown_tool(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_keeps_context() {
        let cause = anyhow::anyhow!("connection refused").context("POST /v1/messages");
        let err = Error::provider("Anthropic Claude", cause);
        let text = err.to_string();
        assert!(text.starts_with("Anthropic Claude provider error"));
        assert!(text.contains("POST /v1/messages"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_tool_round_does_not_nest() {
        let err = Error::tool_round(Error::tool_round(Error::unknown_tool("nope")));
        match &err {
            Error::ToolRound(inner) => assert!(matches!(**inner, Error::UnknownTool(_))),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_unknown_tool());
        assert!(!err.is_provider());
    }
}
