//! coda-chat: conversation orchestration
//!
//! [`ConversationService`] owns the history of one conversation. Each
//! `send_message` call sends the history to the model, runs any tools the
//! model asks for, and sends a follow-up until the model answers in text or
//! the hop limit is reached.

pub mod conversation;
pub mod system_prompt;

pub use conversation::{ConversationConfig, ConversationService, Phase};
pub use system_prompt::DEFAULT_SYSTEM_PROMPT;
