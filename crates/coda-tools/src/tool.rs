//! Core Tool trait and types
//!
//! Defines the interface every local capability implements. `execute` is the
//! only entry point the registry uses and it never fails: validation and
//! execution errors come back as `Error: ` prefixed text.

use async_trait::async_trait;
use coda_core::{Error, Result, ToolResult, ToolSpec};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Core trait for all tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool name (unique identifier)
    fn name(&self) -> &str;

    /// Get human-readable description
    fn description(&self) -> &str;

    /// Get JSON schema for input validation
    fn input_schema(&self) -> Value;

    /// Check parameters without touching any state.
    ///
    /// The default checks the schema's `required` list and the declared
    /// property types. Tools with extra rules call [`check_schema`] first.
    fn validate(&self, input: &Value) -> Result<()> {
        check_schema(&self.input_schema(), input)
    }

    /// Tool body. Only called with parameters that passed `validate`.
    async fn run(&self, input: &Value) -> Result<String>;

    /// Validate and run, folding every failure into the result text.
    async fn execute(&self, input: Value) -> ToolResult {
        if let Err(err) = self.validate(&input) {
            warn!(tool = %self.name(), error = %err, "Rejected tool parameters");
            return ToolResult::error(failure_text(&err));
        }

        match self.run(&input).await {
            Ok(text) => {
                debug!(tool = %self.name(), len = text.len(), "Tool completed");
                ToolResult::success(text)
            }
            Err(err) => {
                warn!(tool = %self.name(), error = %err, "Tool failed");
                ToolResult::error(failure_text(&err))
            }
        }
    }

    /// Description handed to model providers
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(self.name(), self.description(), self.input_schema())
    }
}

/// Type alias for shared tools
pub type BoxedTool = Arc<dyn Tool>;

fn failure_text(err: &Error) -> String {
    match err {
        Error::ToolExecution(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// Check `input` against the `required` list and property types of `schema`.
///
/// A null input counts as an empty object.
pub fn check_schema(schema: &Value, input: &Value) -> Result<()> {
    let empty = serde_json::Map::new();
    let params = match input {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(Error::invalid_parameters(format!(
                "parameters must be an object, got {}",
                type_name(other)
            )))
        }
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            match params.get(key) {
                None | Some(Value::Null) => {
                    return Err(Error::invalid_parameters(format!(
                        "required parameter '{}' is missing",
                        key
                    )))
                }
                Some(_) => {}
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, value) in params {
            let Some(expected) = properties
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let ok = match expected {
                "string" => value.is_string(),
                "boolean" => value.is_boolean(),
                "integer" => value.is_i64() || value.is_u64(),
                "number" => value.is_number(),
                "object" => value.is_object(),
                "array" => value.is_array(),
                _ => true,
            };
            if !ok {
                return Err(Error::invalid_parameters(format!(
                    "parameter '{}' must be a {}, got {}",
                    key,
                    expected,
                    type_name(value)
                )));
            }
        }
    }

    Ok(())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Required string parameter that must not be blank.
pub fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    match input.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        Some(_) => Err(Error::invalid_parameters(format!(
            "parameter '{}' cannot be empty",
            key
        ))),
        None => Err(Error::invalid_parameters(format!(
            "required parameter '{}' is missing",
            key
        ))),
    }
}

pub fn optional_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

pub fn optional_bool(input: &Value, key: &str, default: bool) -> bool {
    input.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Closure-backed tool, handy for tests and ad-hoc capabilities.
#[derive(Clone)]
pub struct SimpleTool {
    name: String,
    description: String,
    schema: Value,
    handler: Arc<dyn Fn(&Value) -> Result<String> + Send + Sync>,
}

impl SimpleTool {
    pub fn new<F>(name: &str, description: &str, schema: Value, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler: Arc::new(handler),
        }
    }
}

#[async_trait]
impl Tool for SimpleTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn run(&self, input: &Value) -> Result<String> {
        (self.handler)(input)
    }
}
