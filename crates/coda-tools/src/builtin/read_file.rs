use async_trait::async_trait;
use coda_core::{Error, Result};
use serde_json::{json, Value};
use std::io::ErrorKind;
use tracing::info;

use crate::security::PathPolicy;
use crate::tool::{check_schema, optional_str, required_str};
use crate::Tool;

/// Largest file `read_file` will return
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

const UTF8_NAMES: &[&str] = &["utf-8", "utf8"];

pub struct ReadFileTool {
    policy: PathPolicy,
}

impl ReadFileTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads file contents from the filesystem. Supports both absolute and relative paths \
         and reports missing, oversized or unreadable files as errors."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read (absolute or relative to the workspace)"
                },
                "encoding": {
                    "type": "string",
                    "description": "The character encoding to use (default: UTF-8)"
                }
            },
            "required": ["path"]
        })
    }

    fn validate(&self, input: &Value) -> Result<()> {
        check_schema(&self.input_schema(), input)?;
        required_str(input, "path")?;
        if let Some(encoding) = optional_str(input, "encoding") {
            let encoding = encoding.trim();
            if !encoding.is_empty() && !UTF8_NAMES.contains(&encoding.to_lowercase().as_str()) {
                return Err(Error::invalid_parameters(format!(
                    "unsupported encoding '{}', only UTF-8 is available",
                    encoding
                )));
            }
        }
        Ok(())
    }

    async fn run(&self, input: &Value) -> Result<String> {
        let raw = required_str(input, "path")?;
        let path = self.policy.resolve(raw)?;
        info!(path = %path.display(), "Reading file");

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::tool_execution(format!("File not found: {}", raw)))
            }
            Err(e) => return Err(io_failure(raw, e)),
        };

        if metadata.is_dir() {
            return Err(Error::tool_execution(format!("Path is a directory: {}", raw)));
        }
        if metadata.len() > MAX_FILE_SIZE {
            return Err(Error::tool_execution(format!(
                "File is too large ({} bytes). Maximum supported file size is {} bytes.",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        let bytes = tokio::fs::read(&path).await.map_err(|e| io_failure(raw, e))?;
        String::from_utf8(bytes)
            .map_err(|_| Error::tool_execution(format!("File is not valid UTF-8 text: {}", raw)))
    }
}

fn io_failure(raw: &str, err: std::io::Error) -> Error {
    match err.kind() {
        ErrorKind::PermissionDenied => {
            Error::tool_execution(format!("Permission denied accessing file: {}", raw))
        }
        _ => Error::tool_execution(format!("IO exception reading file: {}", err)),
    }
}
