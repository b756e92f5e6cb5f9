//! Path policy for file tools
//!
//! Relative paths resolve against a workspace root. Any `..` component is
//! refused, as is any absolute path inside a system directory.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Absolute prefixes that file tools never touch
pub const FORBIDDEN_PREFIXES: &[&str] = &[
    "/etc", "/usr", "/bin", "/sbin", "/boot", "/dev", "/proc", "/sys",
];

/// Security-related errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecurityError {
    #[error("Path traversal detected in '{0}'")]
    PathTraversal(String),

    #[error("Path '{}' is inside a protected system directory", .0.display())]
    PathForbidden(PathBuf),
}

impl From<SecurityError> for coda_core::Error {
    fn from(err: SecurityError) -> Self {
        coda_core::Error::path_not_allowed(err.to_string())
    }
}

/// Resolves tool-supplied paths and rejects unsafe ones
#[derive(Debug, Clone)]
pub struct PathPolicy {
    base_dir: PathBuf,
}

impl PathPolicy {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Policy rooted at the process working directory
    pub fn current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve `raw` to the path a tool should operate on.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, SecurityError> {
        let path = Path::new(raw);

        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            warn!(path = %raw, "Rejected path with traversal segment");
            return Err(SecurityError::PathTraversal(raw.to_string()));
        }

        if path.is_absolute() {
            if let Some(prefix) = FORBIDDEN_PREFIXES.iter().find(|p| path.starts_with(p)) {
                warn!(path = %raw, prefix = %prefix, "Rejected system path");
                return Err(SecurityError::PathForbidden(path.to_path_buf()));
            }
            return Ok(normalize(path));
        }

        Ok(normalize(&self.base_dir.join(path)))
    }
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::current_dir()
    }
}

/// Drop `.` components. `..` never reaches here.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_resolve_against_base() {
        let policy = PathPolicy::new("/workspace/project");
        assert_eq!(
            policy.resolve("src/./main.rs").unwrap(),
            PathBuf::from("/workspace/project/src/main.rs")
        );
        assert_eq!(policy.resolve(".").unwrap(), PathBuf::from("/workspace/project"));
    }

    #[test]
    fn test_traversal_rejected() {
        let policy = PathPolicy::new("/workspace");
        assert_eq!(
            policy.resolve("../secret").unwrap_err(),
            SecurityError::PathTraversal("../secret".to_string())
        );
        assert!(policy.resolve("/tmp/a/../../etc/passwd").is_err());
    }

    #[test]
    fn test_system_prefixes_rejected() {
        let policy = PathPolicy::new("/workspace");
        assert!(matches!(
            policy.resolve("/etc/passwd"),
            Err(SecurityError::PathForbidden(_))
        ));
        assert!(policy.resolve("/usr/bin/env").is_err());
        assert!(policy.resolve("/etcetera/notes.txt").is_ok());
    }

    #[test]
    fn test_converts_to_path_not_allowed() {
        let err: coda_core::Error = SecurityError::PathTraversal("..".into()).into();
        assert!(err.to_string().starts_with("Path not allowed for security reasons"));
    }
}
