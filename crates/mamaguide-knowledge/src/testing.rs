//! In-crate test doubles.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mamaguide_core::error::{MamaGuideError, Result};
use mamaguide_core::traits::Embedder;
use mamaguide_core::types::Embedding;
use tokio::sync::watch;

use crate::document::KnowledgeDocument;

pub(crate) const SAMPLE_JSON: &str = include_str!("../../../data/knowledgeBase.json");

pub(crate) fn sample_document() -> KnowledgeDocument {
    KnowledgeDocument::parse(SAMPLE_JSON, "pregnancyKnowledgeGraph").unwrap()
}

const VOCABULARY: &[&str] = &[
    "folic", "iron", "ibuprofen", "acetaminophen", "labor", "bag", "seat", "coffee", "nausea",
    "swim", "travel", "bleeding", "epidural", "crib",
];

/// Bag-of-words over a small vocabulary. Text with none of the words maps to
/// the zero vector.
pub(crate) struct KeywordEmbedder;

pub(crate) fn keyword_vector(text: &str) -> Embedding {
    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .map(|word| lower.matches(word).count() as f32)
        .collect()
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        Ok(keyword_vector(text))
    }
}

/// Fails for any text containing `needle`; otherwise behaves like
/// [`KeywordEmbedder`].
pub(crate) struct FailingEmbedder {
    pub needle: String,
}

impl FailingEmbedder {
    pub fn on(needle: &str) -> Self {
        Self { needle: needle.to_lowercase() }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        if text.to_lowercase().contains(&self.needle) {
            return Err(MamaGuideError::Embedding("service unavailable".into()));
        }
        Ok(keyword_vector(text))
    }
}

/// Never answers for text containing `needle`.
pub(crate) struct HangingEmbedder {
    pub needle: String,
}

#[async_trait]
impl Embedder for HangingEmbedder {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        if text.to_lowercase().contains(&self.needle) {
            std::future::pending::<()>().await;
        }
        Ok(keyword_vector(text))
    }
}

/// Holds every request until the gate opens.
pub(crate) struct GatedEmbedder {
    gate: watch::Receiver<bool>,
    pub calls: AtomicUsize,
}

impl GatedEmbedder {
    pub fn new() -> (Arc<Self>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        (Arc::new(Self { gate: rx, calls: AtomicUsize::new(0) }), tx)
    }
}

#[async_trait]
impl Embedder for GatedEmbedder {
    fn name(&self) -> &str {
        "gated"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.gate.clone();
        gate.wait_for(|open| *open)
            .await
            .map_err(|e| MamaGuideError::Embedding(e.to_string()))?;
        Ok(keyword_vector(text))
    }
}

/// Records how many requests were in flight at once.
#[derive(Default)]
pub(crate) struct CountingEmbedder {
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn name(&self) -> &str {
        "counting"
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(keyword_vector(text))
    }
}
