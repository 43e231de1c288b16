//! Retrieval service: owns the document and its section snapshots, and
//! answers relevance queries at any point of its lifecycle.
//!
//! ```text
//! Uninitialized ──initialize()──▶ Loading ──▶ Ready ─ ─ (indexing settles) ─ ─▶ Ready
//!                                    └──load fails──▶ ReadyDegraded
//! ```
//!
//! Sections become queryable (text search) as soon as they are flattened.
//! The vector path switches on only once every embedding request has
//! settled and the indexed snapshot is published.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use mamaguide_core::config::{KnowledgeConfig, MamaGuideConfig};
use mamaguide_core::error::Result;
use mamaguide_core::traits::Embedder;
use serde::Serialize;
use serde_json::Value;

use crate::document::{
    FaqEntry, KnowledgeDocument, Medication, NutritionalRequirements, Symptom, WeekGuidance,
};
use crate::flatten::flatten_report;
use crate::index::{IndexReport, VectorIndexer};
use crate::lookup;
use crate::rank::{RankPath, Ranker};
use crate::section::{Section, SectionSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceState {
    Uninitialized,
    Loading,
    Ready,
    /// The document could not be loaded; every query returns nothing.
    ReadyDegraded,
}

impl ServiceState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Loading,
            2 => Self::Ready,
            3 => Self::ReadyDegraded,
            _ => Self::Uninitialized,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Loading => 1,
            Self::Ready => 2,
            Self::ReadyDegraded => 3,
        }
    }
}

pub struct KnowledgeService {
    config: KnowledgeConfig,
    embedder: Option<Arc<dyn Embedder>>,
    embed_timeout: Duration,
    ranker: Ranker,
    state: AtomicU8,
    document: OnceLock<KnowledgeDocument>,
    /// Published right after flattening; never carries embeddings.
    flattened: OnceLock<SectionSet>,
    /// Published once indexing has settled.
    indexed: OnceLock<SectionSet>,
    index_report: OnceLock<IndexReport>,
}

impl KnowledgeService {
    pub fn new(config: KnowledgeConfig, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self::with_timeout(config, embedder, Duration::from_secs(30))
    }

    /// `timeout` bounds each embedding request (sections and queries).
    pub fn with_timeout(
        config: KnowledgeConfig,
        embedder: Option<Arc<dyn Embedder>>,
        timeout: Duration,
    ) -> Self {
        let ranker = Ranker::new(embedder.clone(), config.relevance_threshold, timeout);
        Self {
            config,
            embedder,
            embed_timeout: timeout,
            ranker,
            state: AtomicU8::new(ServiceState::Uninitialized.as_u8()),
            document: OnceLock::new(),
            flattened: OnceLock::new(),
            indexed: OnceLock::new(),
            index_report: OnceLock::new(),
        }
    }

    pub fn from_config(config: &MamaGuideConfig, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self::with_timeout(
            config.knowledge.clone(),
            embedder,
            Duration::from_secs(config.embedding.timeout_secs),
        )
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    pub fn state(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ServiceState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Load the configured source, flatten it and index it.
    ///
    /// Only the first call does anything. Never fails: a load error leaves the
    /// service in `ReadyDegraded`.
    pub async fn initialize(&self) {
        if !self.begin_loading() {
            return;
        }
        tracing::info!("📚 Loading knowledge base from {}", self.config.source);
        let loaded = KnowledgeDocument::load(&self.config.source, &self.config.root_key).await;
        self.finish(loaded).await;
    }

    /// Same as [`initialize`](Self::initialize), with an already-parsed document.
    pub async fn initialize_with(&self, document: KnowledgeDocument) {
        if !self.begin_loading() {
            return;
        }
        self.finish(Ok(document)).await;
    }

    fn begin_loading(&self) -> bool {
        let started = self
            .state
            .compare_exchange(
                ServiceState::Uninitialized.as_u8(),
                ServiceState::Loading.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !started {
            tracing::debug!("Knowledge base already initialized ({:?})", self.state());
        }
        started
    }

    async fn finish(&self, loaded: Result<KnowledgeDocument>) {
        let document = match loaded {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!("❌ Failed to load knowledge base: {e}");
                self.set_state(ServiceState::ReadyDegraded);
                return;
            }
        };

        let report = flatten_report(&document);
        let sections = report.sections;
        tracing::info!("📚 Knowledge base initialized with {} sections", sections.len());

        self.document.set(document).ok();
        self.flattened
            .set(SectionSet::new(sections.clone(), false))
            .ok();
        self.set_state(ServiceState::Ready);

        let Some(embedder) = &self.embedder else {
            tracing::info!("🔍 No embedding service configured, using text search only");
            return;
        };

        let mut sections = sections;
        let report = VectorIndexer::new(embedder.clone(), self.embed_timeout)
            .index(&mut sections)
            .await;
        self.indexed.set(SectionSet::new(sections, true)).ok();
        self.index_report.set(report).ok();
    }

    /// Whether the indexed snapshot has been published.
    pub fn is_indexed(&self) -> bool {
        self.indexed.get().is_some()
    }

    pub fn index_report(&self) -> Option<&IndexReport> {
        self.index_report.get()
    }

    fn current(&self) -> Option<&SectionSet> {
        self.indexed.get().or_else(|| self.flattened.get())
    }

    pub fn sections(&self) -> &[Section] {
        self.current().map(SectionSet::sections).unwrap_or_default()
    }

    pub fn section_count(&self) -> usize {
        self.sections().len()
    }

    pub fn document(&self) -> Option<&KnowledgeDocument> {
        self.document.get()
    }

    /// Top `top_k` sections for `query`. Empty before initialization, in the
    /// degraded state, or when nothing matches.
    pub async fn find_relevant_sections(&self, query: &str, top_k: usize) -> Vec<Section> {
        self.search(query, top_k).await.0
    }

    pub async fn search(&self, query: &str, top_k: usize) -> (Vec<Section>, RankPath) {
        let Some(set) = self.current() else {
            return (vec![], RankPath::Text);
        };
        let (hits, path) = self.ranker.rank_with_path(set, query, top_k).await;
        tracing::debug!("🔍 '{}' -> {} section(s) via {:?} path", query.trim(), hits.len(), path);
        (hits, path)
    }

    // ── Structured lookups ──────────────────────────────────

    pub fn week_info(&self, week: u32) -> Option<WeekGuidance> {
        lookup::week_info(self.document()?, week)
    }

    pub fn check_medication_safety(&self, name: &str) -> Vec<Medication> {
        self.document()
            .map(|doc| lookup::check_medication_safety(doc, name))
            .unwrap_or_default()
    }

    pub fn medications_for_condition(&self, condition: &str) -> Vec<Medication> {
        self.document()
            .map(|doc| lookup::medications_for_condition(doc, condition))
            .unwrap_or_default()
    }

    pub fn symptom_info(&self, sign: &str) -> Vec<Symptom> {
        self.document()
            .map(|doc| lookup::symptom_info(doc, sign))
            .unwrap_or_default()
    }

    pub fn symptoms_in_category(&self, category: &str) -> Vec<Symptom> {
        self.document()
            .map(|doc| lookup::symptoms_in_category(doc, category))
            .unwrap_or_default()
    }

    pub fn symptoms_by_severity(&self, severity: &str) -> Vec<Symptom> {
        self.document()
            .map(|doc| lookup::symptoms_by_severity(doc, severity))
            .unwrap_or_default()
    }

    pub fn emergency_symptoms(&self) -> Vec<Symptom> {
        self.document()
            .map(lookup::emergency_symptoms)
            .unwrap_or_default()
    }

    pub fn nutritional_requirements(&self) -> NutritionalRequirements {
        self.document()
            .map(lookup::nutritional_requirements)
            .unwrap_or_default()
    }

    pub fn common_questions(&self) -> Vec<FaqEntry> {
        self.document()
            .map(lookup::common_questions)
            .unwrap_or_default()
    }

    /// Raw fragment for a top-level topic.
    pub fn topic(&self, key: &str) -> Option<&Value> {
        self.document()?.topic(key)
    }

    /// Top-level topic keys in document order. Empty until loaded.
    pub fn topic_keys(&self) -> Vec<&str> {
        self.document()
            .map(KnowledgeDocument::topic_keys)
            .unwrap_or_default()
    }

    pub fn labor_and_delivery(&self) -> Option<&Value> {
        self.topic("laborAndDelivery")
    }

    pub fn hospital_preparation(&self) -> Option<&Value> {
        self.topic("hospitalPreparation")
    }

    pub fn baby_gear(&self) -> Option<&Value> {
        self.topic("babyGear")
    }

    pub fn preparing_for_labor(&self) -> Option<&Value> {
        self.topic("preparingForLabor")
    }

    pub fn general_guidelines(&self) -> Option<&Value> {
        self.topic("generalGuidelines")
    }

    pub fn cesarean_delivery(&self) -> Option<&Value> {
        self.topic("cesareanDelivery")
    }
}
