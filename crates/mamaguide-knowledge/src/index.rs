//! Vector indexer: embeds every section concurrently and waits for all of
//! the requests to settle before reporting.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use mamaguide_core::error::{MamaGuideError, Result};
use mamaguide_core::traits::Embedder;
use mamaguide_core::types::Embedding;

use crate::section::Section;

/// Outcome of one indexing pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexReport {
    pub embedded: usize,
    /// Ids of sections left without an embedding.
    pub failed: Vec<String>,
}

impl IndexReport {
    pub fn total(&self) -> usize {
        self.embedded + self.failed.len()
    }
}

pub struct VectorIndexer {
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
}

impl VectorIndexer {
    pub fn new(embedder: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self { embedder, timeout }
    }

    /// Embed every section. A failed or timed-out request leaves that
    /// section's embedding absent; the others are unaffected.
    pub async fn index(&self, sections: &mut [Section]) -> IndexReport {
        tracing::info!(
            "🧮 Generating embeddings for {} sections via {}",
            sections.len(),
            self.embedder.name()
        );

        let results = join_all(sections.iter().map(|s| self.embed_one(&s.content))).await;

        let mut report = IndexReport::default();
        for (section, result) in sections.iter_mut().zip(results) {
            match result {
                Ok(embedding) => {
                    section.embedding = Some(embedding);
                    report.embedded += 1;
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to embed section '{}': {e}", section.id);
                    section.embedding = None;
                    report.failed.push(section.id.clone());
                }
            }
        }

        tracing::info!(
            "✅ Indexed {}/{} sections ({} failed)",
            report.embedded,
            report.total(),
            report.failed.len()
        );
        report
    }

    async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let embedding = tokio::time::timeout(self.timeout, self.embedder.embed(text))
            .await
            .map_err(|_| MamaGuideError::Timeout(self.timeout.as_secs()))??;

        if embedding.is_empty() {
            return Err(MamaGuideError::Embedding("empty embedding vector".into()));
        }
        Ok(embedding)
    }
}
