use async_trait::async_trait;
use coda_core::{Error, Result};
use serde_json::{json, Value};
use std::fmt::Write;
use std::io::ErrorKind;
use tracing::info;

use crate::security::PathPolicy;
use crate::tool::{optional_bool, optional_str};
use crate::Tool;

/// Marker returned for a directory with nothing to show
pub const EMPTY_MARKER: &str = "(empty)";

pub struct ListFilesTool {
    policy: PathPolicy,
}

impl ListFilesTool {
    pub fn new(policy: PathPolicy) -> Self {
        Self { policy }
    }
}

struct Entry {
    name: String,
    is_dir: bool,
    size: Option<u64>,
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "Lists the contents of a directory, including files and subdirectories"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The directory path to list. Defaults to the workspace root if not provided"
                },
                "show_hidden": {
                    "type": "boolean",
                    "description": "Whether to show hidden files (files starting with dot). Defaults to false"
                }
            }
        })
    }

    async fn run(&self, input: &Value) -> Result<String> {
        let raw = optional_str(input, "path")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(".");
        let show_hidden = optional_bool(input, "show_hidden", false);
        let path = self.policy.resolve(raw)?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::tool_execution(format!("Directory not found: {}", raw)))
            }
            Err(e) => return Err(list_failure(e)),
        };
        if !metadata.is_dir() {
            return Err(Error::tool_execution(format!("Path is not a directory: {}", raw)));
        }

        info!(path = %path.display(), show_hidden, "Listing directory");

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&path).await.map_err(list_failure)?;
        while let Some(item) = dir.next_entry().await.map_err(list_failure)? {
            let name = item.file_name().to_string_lossy().into_owned();
            if !show_hidden && name.starts_with('.') {
                continue;
            }
            // Follows symlinks, like the directory check above.
            let (is_dir, size) = match tokio::fs::metadata(item.path()).await {
                Ok(m) if m.is_dir() => (true, None),
                Ok(m) if m.is_file() => (false, Some(m.len())),
                _ => (false, None),
            };
            entries.push(Entry { name, is_dir, size });
        }
        entries.sort_by_key(|e| e.name.to_lowercase());

        let mut out = String::new();
        let _ = write!(out, "Directory: {}\n\n", path.display());
        if entries.is_empty() {
            out.push_str(EMPTY_MARKER);
            return Ok(out);
        }
        for entry in &entries {
            let kind = if entry.is_dir { "[directory]" } else { "[file]" };
            let _ = write!(out, "{} {}", entry.name, kind);
            if let Some(size) = entry.size {
                let _ = write!(out, " - {}", format_size(size));
            }
            out.push('\n');
        }
        Ok(out)
    }
}

fn list_failure(err: std::io::Error) -> Error {
    match err.kind() {
        ErrorKind::PermissionDenied => Error::tool_execution(format!("Permission denied - {}", err)),
        _ => Error::Io(err),
    }
}

/// Human-readable size with one decimal above a kilobyte
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else if b < KB * KB * KB {
        format!("{:.1} MB", b / (KB * KB))
    } else {
        format!("{:.1} GB", b / (KB * KB * KB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ListFilesTool::new(PathPolicy::new(dir.path()));

        let result = tool.execute(json!({})).await;
        assert!(!result.is_error);
        assert!(result.text.contains(EMPTY_MARKER));
        assert!(!result.text.contains("[file]"));
        assert!(!result.text.contains("[directory]"));
    }

    #[tokio::test]
    async fn test_lists_sorted_entries_with_sizes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "12345").unwrap();
        fs::write(dir.path().join("A.md"), vec![0u8; 2048]).unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join(".hidden"), "x").unwrap();

        let tool = ListFilesTool::new(PathPolicy::new(dir.path()));
        let text = tool.execute(json!({"path": "."})).await.text;

        let body: Vec<&str> = text.split("\n\n").nth(1).unwrap().lines().collect();
        assert_eq!(
            body,
            vec!["A.md [file] - 2.0 KB", "b.txt [file] - 5 bytes", "src [directory]"]
        );
        assert!(text.starts_with(&format!("Directory: {}", dir.path().display())));

        let with_hidden = tool.execute(json!({"show_hidden": true})).await.text;
        assert!(with_hidden.contains(".hidden [file] - 1 bytes"));
    }

    #[tokio::test]
    async fn test_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();
        let tool = ListFilesTool::new(PathPolicy::new(dir.path()));

        let result = tool.execute(json!({"path": "file.txt"})).await;
        assert_eq!(result.text, "Error: Path is not a directory: file.txt");

        let result = tool.execute(json!({"path": "missing"})).await;
        assert_eq!(result.text, "Error: Directory not found: missing");
    }

    #[tokio::test]
    async fn test_rejects_wrong_parameter_type() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ListFilesTool::new(PathPolicy::new(dir.path()));
        let result = tool.execute(json!({"show_hidden": "yes"})).await;
        assert!(result.is_error);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 bytes");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
