//! Completion service boundary.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Message, ProviderResponse};

/// Sampling parameters for a completion request.
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerateParams {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            temperature: 0.7,
            max_tokens: 600,
        }
    }
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g. "openai", "ollama").
    fn name(&self) -> &str;

    /// Send a chat conversation and get the response.
    async fn chat(&self, messages: &[Message], params: &GenerateParams) -> Result<ProviderResponse>;

    /// Single-turn completion: one system message and one user message in,
    /// the reply text out.
    ///
    /// A response without content is returned as an empty string; callers
    /// decide what to show for that.
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        params: &GenerateParams,
    ) -> Result<String> {
        let messages = [Message::system(system_prompt), Message::user(user_message)];
        let response = self.chat(&messages, params).await?;
        Ok(response.content.unwrap_or_default())
    }

    /// Whether the provider looks usable (credentials present / server reachable).
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
