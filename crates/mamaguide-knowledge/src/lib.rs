//! # MamaGuide Knowledge Base
//!
//! Retrieval over a nested pregnancy-guidance document.
//!
//! ## How it works
//! ```text
//! knowledgeBase.json
//!   ↓ flatten (one extractor per topic)
//! Sections { id, content }
//!   ↓ VectorIndexer (concurrent embed, partial failure tolerated)
//! Sections { id, content, embedding? }
//!   ↓ Ranker
//! cosine > threshold → top-K
//!   ↓ nothing above threshold / no embeddings / embedder down
//! case-insensitive substring match → top-K
//! ```
//!
//! The document itself stays available for structured lookups
//! (week guidance, medication safety, symptom triage).

pub mod document;
pub mod flatten;
pub mod index;
pub mod lookup;
pub mod rank;
pub mod section;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use document::KnowledgeDocument;
pub use flatten::{FlattenReport, flatten};
pub use index::{IndexReport, VectorIndexer};
pub use rank::{RankPath, Ranker};
pub use section::{Section, SectionSet};
pub use service::{KnowledgeService, ServiceState};
