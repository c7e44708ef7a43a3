//! Conversation memory for chat completions
//!
//! A bounded FIFO window of recent user/assistant exchanges. It lives for
//! one session and is never persisted.

mod buffer;

pub use buffer::{ContextBuffer, Exchange, Role, SUMMARY_CHARS, SUMMARY_DELIMITER};
