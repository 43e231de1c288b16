//! Relevance ranking: cosine similarity over embedded sections, with a
//! case-insensitive substring fallback.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use mamaguide_core::error::MamaGuideError;
use mamaguide_core::traits::Embedder;
use serde::Serialize;

use crate::section::{Section, SectionSet};

/// Similarity a section must exceed to count as a vector match.
pub const DEFAULT_RELEVANCE_THRESHOLD: f32 = 0.3;

/// Which path produced a ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankPath {
    /// Cosine similarity above the threshold.
    Vector,
    /// Substring match: no embedder, indexing not settled, or the query
    /// could not be embedded.
    Text,
    /// Vector search found nothing above the threshold, so the substring
    /// match ran instead.
    Escape,
}

/// Cosine similarity. Mismatched lengths or a zero-norm vector score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Sections whose content contains `query` case-insensitively, in document
/// order, truncated to `top_k`.
pub fn text_search(sections: &[Section], query: &str, top_k: usize) -> Vec<Section> {
    let needle = query.to_lowercase();
    sections
        .iter()
        .filter(|s| s.content.to_lowercase().contains(&needle))
        .take(top_k)
        .cloned()
        .collect()
}

/// Embedded sections scoring strictly above `threshold`, best first.
/// Equal scores keep document order.
pub fn vector_search<'a>(
    sections: &'a [Section],
    query: &[f32],
    top_k: usize,
    threshold: f32,
) -> Vec<(&'a Section, f32)> {
    let mut scored: Vec<(&Section, f32)> = sections
        .iter()
        .filter_map(|s| {
            let embedding = s.embedding.as_deref().filter(|e| !e.is_empty())?;
            Some((s, cosine_similarity(query, embedding)))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored
        .into_iter()
        .filter(|(_, score)| *score > threshold)
        .take(top_k)
        .collect()
}

pub struct Ranker {
    embedder: Option<Arc<dyn Embedder>>,
    threshold: f32,
    timeout: Duration,
}

impl Ranker {
    pub fn new(embedder: Option<Arc<dyn Embedder>>, threshold: f32, timeout: Duration) -> Self {
        Self {
            embedder,
            threshold,
            timeout,
        }
    }

    /// Top `top_k` sections for `query`.
    pub async fn rank(&self, set: &SectionSet, query: &str, top_k: usize) -> Vec<Section> {
        self.rank_with_path(set, query, top_k).await.0
    }

    /// Like [`rank`](Self::rank), also reporting which path answered.
    /// A blank query matches nothing.
    pub async fn rank_with_path(
        &self,
        set: &SectionSet,
        query: &str,
        top_k: usize,
    ) -> (Vec<Section>, RankPath) {
        let query = query.trim();
        if query.is_empty() || top_k == 0 {
            return (vec![], RankPath::Text);
        }

        let embedder = match &self.embedder {
            Some(embedder) if set.is_indexed() => embedder,
            _ => return (text_search(set.sections(), query, top_k), RankPath::Text),
        };

        let query_vec = match tokio::time::timeout(self.timeout, embedder.embed(query)).await {
            Ok(Ok(v)) if !v.is_empty() => v,
            Ok(Ok(_)) => {
                tracing::warn!("⚠️ Empty query embedding, using text search");
                return (text_search(set.sections(), query, top_k), RankPath::Text);
            }
            Ok(Err(e)) => {
                tracing::warn!("⚠️ Query embedding failed, using text search: {e}");
                return (text_search(set.sections(), query, top_k), RankPath::Text);
            }
            Err(_) => {
                let e = MamaGuideError::Timeout(self.timeout.as_secs());
                tracing::warn!("⚠️ Query embedding failed, using text search: {e}");
                return (text_search(set.sections(), query, top_k), RankPath::Text);
            }
        };

        let hits = vector_search(set.sections(), &query_vec, top_k, self.threshold);
        if hits.is_empty() {
            tracing::debug!("🔍 No section above {} similarity, using text search", self.threshold);
            return (text_search(set.sections(), query, top_k), RankPath::Escape);
        }

        tracing::debug!(
            "🔍 {} vector matches (best {:.3})",
            hits.len(),
            hits.first().map(|(_, score)| *score).unwrap_or_default()
        );
        (
            hits.into_iter().map(|(s, _)| s.clone()).collect(),
            RankPath::Vector,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VectorIndexer;
    use crate::flatten::flatten;
    use crate::testing::{FailingEmbedder, KeywordEmbedder, keyword_vector, sample_document};

    fn embedded(id: &str, content: &str, embedding: Vec<f32>) -> Section {
        let mut section = Section::new(id, content);
        section.embedding = Some(embedding);
        section
    }

    async fn indexed_sample(embedder: Arc<dyn Embedder>) -> SectionSet {
        let mut sections = flatten(&sample_document());
        VectorIndexer::new(embedder, Duration::from_secs(5))
            .index(&mut sections)
            .await;
        SectionSet::new(sections, true)
    }

    fn ranker(embedder: Option<Arc<dyn Embedder>>) -> Ranker {
        Ranker::new(embedder, DEFAULT_RELEVANCE_THRESHOLD, Duration::from_secs(5))
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_vector_search_threshold_is_exclusive() {
        let sections = vec![
            embedded("above", "a", vec![1.0, 0.0]),
            embedded("at", "b", vec![3.0, 4.0]),
            embedded("below", "c", vec![0.0, 1.0]),
        ];
        // A score equal to the threshold is not a match.
        let threshold = cosine_similarity(&[1.0, 0.0], &[3.0, 4.0]);
        let hits = vector_search(&sections, &[1.0, 0.0], 5, threshold);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, "above");
    }

    #[test]
    fn test_vector_search_orders_and_truncates() {
        let sections = vec![
            embedded("mid", "a", vec![1.0, 1.0]),
            embedded("best", "b", vec![1.0, 0.1]),
            embedded("tie", "c", vec![1.0, 1.0]),
            Section::new("unembedded", "d"),
        ];
        let hits = vector_search(&sections, &[1.0, 0.0], 2, 0.3);
        let ids: Vec<&str> = hits.iter().map(|(s, _)| s.id.as_str()).collect();
        assert_eq!(ids, vec!["best", "mid"]);
        assert!(hits[0].1 >= hits[1].1);
    }

    #[test]
    fn test_text_search_is_case_insensitive_in_document_order() {
        let sections = vec![
            Section::new("1", "Iron rich foods"),
            Section::new("2", "nothing here"),
            Section::new("3", "Take IRON with vitamin C"),
            Section::new("4", "iron again"),
        ];
        let hits = text_search(&sections, "iRoN", 2);
        let ids: Vec<&str> = hits.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_rank_without_embedder_uses_text() {
        let set = SectionSet::new(flatten(&sample_document()), false);
        let (hits, path) = ranker(None).rank_with_path(&set, "folic acid", 3).await;
        assert_eq!(path, RankPath::Text);
        assert_eq!(hits[0].id, "nutrition-daily");
    }

    #[tokio::test]
    async fn test_rank_vector_path() {
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let set = indexed_sample(embedder.clone()).await;
        let (hits, path) = ranker(Some(embedder)).rank_with_path(&set, "ibuprofen", 3).await;

        assert_eq!(path, RankPath::Vector);
        assert_eq!(hits[0].id, "medication-pain-ibuprofen");
        let query = keyword_vector("ibuprofen");
        for hit in &hits {
            let score = cosine_similarity(&query, hit.embedding.as_deref().unwrap());
            assert!(score > DEFAULT_RELEVANCE_THRESHOLD);
        }
    }

    #[tokio::test]
    async fn test_rank_escape_to_text_when_nothing_clears_threshold() {
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let set = indexed_sample(embedder.clone()).await;
        // No vocabulary word: the query embeds to the zero vector.
        let (hits, path) = ranker(Some(embedder)).rank_with_path(&set, "tums", 3).await;

        assert_eq!(path, RankPath::Escape);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "medication-heartburn-calcium-carbonate");
    }

    #[tokio::test]
    async fn test_rank_query_embedding_failure_uses_text() {
        let set = indexed_sample(Arc::new(KeywordEmbedder)).await;
        let failing: Arc<dyn Embedder> = Arc::new(FailingEmbedder::on("crib"));
        let (hits, path) = ranker(Some(failing)).rank_with_path(&set, "crib", 3).await;

        assert_eq!(path, RankPath::Text);
        assert_eq!(hits[0].id, "gear-crib");
    }

    #[tokio::test]
    async fn test_unindexed_set_never_embeds_query() {
        let set = SectionSet::new(flatten(&sample_document()), false);
        let failing: Arc<dyn Embedder> = Arc::new(FailingEmbedder::on(""));
        let (hits, path) = ranker(Some(failing)).rank_with_path(&set, "Swaddle", 3).await;
        assert_eq!(path, RankPath::Text);
        assert_eq!(hits[0].id, "hospital-forbaby");
    }

    #[tokio::test]
    async fn test_no_match_anywhere_is_empty() {
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let set = indexed_sample(embedder.clone()).await;
        let hits = ranker(Some(embedder)).rank(&set, "xyzzy plugh", 3).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_and_zero_k() {
        let set = SectionSet::new(flatten(&sample_document()), false);
        assert!(ranker(None).rank(&set, "   ", 3).await.is_empty());
        assert!(ranker(None).rank(&set, "iron", 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_result_length_is_top_k_or_all_matches() {
        let set = SectionSet::new(flatten(&sample_document()), false);
        for query in ["a", "iron", "pregnancy", "labor"] {
            let qualifying = text_search(set.sections(), query, usize::MAX).len();
            for k in 1..=8 {
                let hits = ranker(None).rank(&set, query, k).await;
                assert_eq!(hits.len(), k.min(qualifying), "query {query:?}, k = {k}");
            }
        }
    }

    #[tokio::test]
    async fn test_vector_result_length_is_top_k_or_all_above_threshold() {
        let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
        let set = indexed_sample(embedder.clone()).await;
        let query = keyword_vector("labor");
        let qualifying =
            vector_search(set.sections(), &query, usize::MAX, DEFAULT_RELEVANCE_THRESHOLD).len();
        assert!(qualifying > 0);
        for k in 1..=8 {
            let (hits, path) = ranker(Some(embedder.clone()))
                .rank_with_path(&set, "labor", k)
                .await;
            assert_eq!(path, RankPath::Vector);
            assert_eq!(hits.len(), k.min(qualifying), "k = {k}");
        }
    }
}
