//! Chat completions
//!
//! The assistant sends a system prompt plus the conversation window to an
//! OpenAI-compatible `/chat/completions` endpoint and gets one reply back.

mod openai;
pub mod retry;

use async_trait::async_trait;

use crate::Result;
use crate::context::Exchange;

pub use openai::{CompletionConfig, OpenAiCompatible};
pub use retry::RetryPolicy;

/// Produces an assistant reply for a conversation
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete the conversation `messages` under `system_prompt`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Completion`] on network, auth, quota or
    /// response-shape failures
    async fn complete(&self, system_prompt: &str, messages: &[Exchange]) -> Result<String>;
}

/// Stand-in used when no API key is configured; every request fails
#[derive(Debug, Clone, Default)]
pub struct Unconfigured;

#[async_trait]
impl CompletionService for Unconfigured {
    async fn complete(&self, _system_prompt: &str, _messages: &[Exchange]) -> Result<String> {
        Err(crate::Error::Completion(
            "no completion API key configured".to_string(),
        ))
    }
}
