//! Embedding service boundary: text in, fixed-length vector out.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Embedding;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embedder name (for logs).
    fn name(&self) -> &str;

    /// Embed one piece of text.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}
