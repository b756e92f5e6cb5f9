//! System prompt for the code-editing assistant

use coda_core::{Error, Result};
use std::path::Path;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a careful coding assistant working inside the user's \
project directory. You can read files, list directories, edit files by exact text replacement, and \
run the project's tests. Look at the relevant files before changing them, keep edits minimal, and \
run the tests after editing when it makes sense. Only report changes that a tool actually made. If a \
tool returns an error, say so and explain what you will try next.";

/// Read a prompt from `path`, or use the default when no path is given.
pub fn load_system_prompt(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        return Ok(DEFAULT_SYSTEM_PROMPT.to_string());
    };
    let prompt = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("cannot read system prompt {}: {}", path.display(), e))
    })?;
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(Error::config(format!("system prompt {} is empty", path.display())));
    }
    Ok(prompt.to_string())
}
