//! Core types and utilities for coda
//!
//! # Modules
//!
//! - `config`: Environment file loading and agent settings
//! - `error`: Error types and Result alias
//! - `history`: Append-only conversation history
//! - `types`: Messages, tool descriptions, invocations and results

pub mod config;
pub mod error;
pub mod history;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use history::ConversationHistory;
pub use types::*;
