//! Retrievable sections.

use mamaguide_core::types::Embedding;
use serde::{Deserialize, Serialize};

/// One retrievable unit of text derived from the knowledge document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Stable, human-readable id derived from the topic and the record's keys.
    pub id: String,
    pub content: String,
    /// Present once the indexer has embedded this section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Embedding>,
}

impl Section {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            embedding: None,
        }
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// An immutable snapshot of the flattened sections.
///
/// `indexed` is true only for the snapshot produced after every embedding
/// request has settled (successfully or not).
#[derive(Debug, Clone, Default)]
pub struct SectionSet {
    sections: Vec<Section>,
    indexed: bool,
}

impl SectionSet {
    pub fn new(sections: Vec<Section>, indexed: bool) -> Self {
        Self { sections, indexed }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Number of sections carrying an embedding.
    pub fn embedded_count(&self) -> usize {
        self.sections.iter().filter(|s| s.has_embedding()).count()
    }

    pub fn get(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }
}

/// Lowercase with every whitespace run collapsed to `-`.
pub fn slugify(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
