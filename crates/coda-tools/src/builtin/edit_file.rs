use async_trait::async_trait;
use coda_core::{Error, Result};
use serde_json::{json, Value};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::info;

use crate::security::PathPolicy;
use crate::tool::{check_schema, required_str};
use crate::Tool;

/// Text replacement in a single file.
///
/// The original content is copied to `<path>.backup` before the new content
/// is written. Nothing is written when the search text is absent.
pub struct EditFileTool {
    policy: PathPolicy,
}

impl EditFileTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Performs simple text replacement in files. Creates a backup before editing \
         and validates that search text exists."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to edit"
                },
                "search_text": {
                    "type": "string",
                    "description": "The text to search for and replace"
                },
                "replace_text": {
                    "type": "string",
                    "description": "The text to replace the search text with"
                }
            },
            "required": ["path", "search_text", "replace_text"]
        })
    }

    fn validate(&self, input: &Value) -> Result<()> {
        check_schema(&self.input_schema(), input)?;
        required_str(input, "path")?;
        required_str(input, "search_text")?;
        Ok(())
    }

    async fn run(&self, input: &Value) -> Result<String> {
        let raw = required_str(input, "path")?;
        let search = required_str(input, "search_text")?;
        let replace = input
            .get("replace_text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let path = self.policy.resolve(raw)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::tool_execution(format!("File not found: {}", raw)))
            }
            Err(e) => return Err(Error::tool_execution(format!("Failed to read file: {}", e))),
        };
        if !metadata.is_file() {
            return Err(Error::tool_execution(format!(
                "Path is not a regular file: {}",
                raw
            )));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::tool_execution(format!("Failed to read file: {}", e)))?;

        let occurrences = content.matches(search).count();
        if occurrences == 0 {
            info!(path = %path.display(), "Search text not found");
            return Err(Error::tool_execution(format!(
                "Text '{}' not found in file",
                search
            )));
        }

        let backup = backup_path(&path);
        tokio::fs::copy(&path, &backup)
            .await
            .map_err(|e| Error::tool_execution(format!("Failed to create backup file: {}", e)))?;

        let updated = content.replace(search, replace);
        tokio::fs::write(&path, updated)
            .await
            .map_err(|e| Error::tool_execution(format!("Failed to write to file: {}", e)))?;

        info!(
            path = %path.display(),
            backup = %backup.display(),
            occurrences,
            "Edited file"
        );

        Ok(format!(
            "File edited successfully! Replaced {} occurrences of '{}' with '{}' in {}. \
             Backup created at {}.backup",
            occurrences, search, replace, raw, raw
        ))
    }
}

fn backup_path(path: &std::path::Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_replaces_all_occurrences_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("pets.txt");
        fs::write(&file, "cat dog cat").unwrap();

        let tool = EditFileTool::new(PathPolicy::new(dir.path()));
        let result = tool
            .execute(json!({"path": "pets.txt", "search_text": "cat", "replace_text": "fox"}))
            .await;

        assert!(!result.is_error, "{}", result.text);
        assert_eq!(fs::read_to_string(&file).unwrap(), "fox dog fox");
        assert_eq!(
            fs::read_to_string(dir.path().join("pets.txt.backup")).unwrap(),
            "cat dog cat"
        );
        assert_eq!(
            result.text,
            "File edited successfully! Replaced 2 occurrences of 'cat' with 'fox' in pets.txt. \
             Backup created at pets.txt.backup"
        );
    }

    #[tokio::test]
    async fn test_absent_search_text_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("greeting.txt");
        fs::write(&file, "hello").unwrap();

        let tool = EditFileTool::new(PathPolicy::new(dir.path()));
        let result = tool
            .execute(json!({"path": "greeting.txt", "search_text": "xyz", "replace_text": "abc"}))
            .await;

        assert!(result.is_error);
        assert!(result.text.contains("not found"));
        assert_eq!(fs::read_to_string(&file).unwrap(), "hello");
        assert!(!dir.path().join("greeting.txt.backup").exists());
    }

    #[tokio::test]
    async fn test_empty_replacement_deletes_text() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, "keep remove keep").unwrap();

        let tool = EditFileTool::new(PathPolicy::new(dir.path()));
        let result = tool
            .execute(json!({"path": "a.txt", "search_text": " remove", "replace_text": ""}))
            .await;
        assert!(!result.is_error);
        assert_eq!(fs::read_to_string(&file).unwrap(), "keep keep");
    }

    #[tokio::test]
    async fn test_rejections() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let tool = EditFileTool::new(PathPolicy::new(dir.path()));

        let traversal = tool
            .execute(json!({"path": "../x", "search_text": "a", "replace_text": "b"}))
            .await;
        assert!(traversal.text.starts_with("Error: Path not allowed for security reasons"));

        let system = tool
            .execute(json!({"path": "/etc/hosts", "search_text": "a", "replace_text": "b"}))
            .await;
        assert!(system.text.starts_with("Error: Path not allowed for security reasons"));

        let missing = tool
            .execute(json!({"path": "gone.txt", "search_text": "a", "replace_text": "b"}))
            .await;
        assert_eq!(missing.text, "Error: File not found: gone.txt");

        let directory = tool
            .execute(json!({"path": "sub", "search_text": "a", "replace_text": "b"}))
            .await;
        assert_eq!(directory.text, "Error: Path is not a regular file: sub");

        let no_replace = tool.execute(json!({"path": "a.txt", "search_text": "a"})).await;
        assert!(no_replace.text.contains("'replace_text' is missing"));
    }
}
