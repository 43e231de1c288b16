//! # MamaGuide Assistant
//!
//! Answer composer: retrieves knowledge sections for a question, asks the
//! completion service for an answer grounded in them, and labels the answer
//! with where it came from.
//!
//! The label depends only on retrieval. If any section was retrieved and the
//! completion succeeded, the answer is `knowledge-base`; otherwise it is
//! `ai-general`. Markers the model is asked to emit are stripped and never
//! trusted.

pub mod prompt;
pub mod session;

use std::sync::Arc;

use mamaguide_core::config::MamaGuideConfig;
use mamaguide_core::error::MamaGuideError;
use mamaguide_core::traits::{GenerateParams, Provider};
use mamaguide_knowledge::KnowledgeService;
use serde::{Deserialize, Serialize};

pub use session::{ChatSession, ChatTurn, GREETING, SUGGESTED_QUESTIONS};

pub const NOT_CONFIGURED_MESSAGE: &str =
    "API key not configured. Set `api_key` in ~/.mamaguide/config.toml or the OPENAI_API_KEY environment variable.";
pub const FAILURE_MESSAGE: &str =
    "Sorry, I'm having trouble responding right now. Please try again later.";
pub const EMPTY_COMPLETION_MESSAGE: &str = "I couldn't generate a response.";
pub const BLANK_QUESTION_MESSAGE: &str = "Please enter a question.";

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    KnowledgeBase,
    AiGeneral,
    Error,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeBase => "knowledge-base",
            Self::AiGeneral => "ai-general",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub content: String,
    pub provenance: Provenance,
    /// Ids of the sections given to the model as context.
    #[serde(default)]
    pub section_ids: Vec<String>,
}

impl Answer {
    fn error(content: &str, section_ids: Vec<String>) -> Self {
        Self {
            content: content.to_string(),
            provenance: Provenance::Error,
            section_ids,
        }
    }
}

pub struct ChatAssistant {
    knowledge: Arc<KnowledgeService>,
    provider: Option<Box<dyn Provider>>,
    params: GenerateParams,
    top_k: usize,
}

impl ChatAssistant {
    pub fn new(
        knowledge: Arc<KnowledgeService>,
        provider: Option<Box<dyn Provider>>,
        params: GenerateParams,
        top_k: usize,
    ) -> Self {
        Self {
            knowledge,
            provider,
            params,
            top_k,
        }
    }

    /// Build from configuration. A provider that cannot be created is logged
    /// and treated as not configured.
    pub fn from_config(config: &MamaGuideConfig, knowledge: Arc<KnowledgeService>) -> Self {
        let provider = match mamaguide_providers::create_provider(config) {
            Ok(p) => {
                tracing::info!("🤖 Chat provider: {} ({})", p.name(), config.llm_model());
                Some(p)
            }
            Err(e) => {
                tracing::warn!("⚠️ Chat provider unavailable: {e}");
                None
            }
        };
        let params = GenerateParams {
            model: config.llm_model().to_string(),
            temperature: config.default_temperature,
            max_tokens: config.max_tokens,
        };
        Self::new(knowledge, provider, params, config.knowledge.chat_top_k)
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeService> {
        &self.knowledge
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Answer one question. Never fails: problems become `error` answers.
    pub async fn answer(&self, question: &str) -> Answer {
        let question = question.trim();
        if question.is_empty() {
            return Answer::error(BLANK_QUESTION_MESSAGE, vec![]);
        }

        let sections = self
            .knowledge
            .find_relevant_sections(question, self.top_k)
            .await;
        let section_ids: Vec<String> = sections.iter().map(|s| s.id.clone()).collect();
        tracing::info!("📨 Question answered with {} knowledge sections", sections.len());

        let Some(provider) = &self.provider else {
            return Answer::error(NOT_CONFIGURED_MESSAGE, section_ids);
        };

        let system_prompt = prompt::system_prompt(&sections);
        let raw = match provider.complete(&system_prompt, question, &self.params).await {
            Ok(text) => text,
            Err(MamaGuideError::ApiKeyMissing(name)) => {
                tracing::warn!("⚠️ No API key for chat provider {name}");
                return Answer::error(NOT_CONFIGURED_MESSAGE, section_ids);
            }
            Err(e) => {
                tracing::error!("❌ Chat completion failed: {e}");
                return Answer::error(FAILURE_MESSAGE, section_ids);
            }
        };

        let mut content = prompt::strip_markers(&raw);
        if content.is_empty() {
            content = EMPTY_COMPLETION_MESSAGE.to_string();
        }

        let provenance = if sections.is_empty() {
            Provenance::AiGeneral
        } else {
            Provenance::KnowledgeBase
        };
        tracing::debug!("Answer source: {provenance}");

        Answer {
            content,
            provenance,
            section_ids,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use mamaguide_core::config::KnowledgeConfig;
    use mamaguide_core::error::Result;
    use mamaguide_core::types::{Message, ProviderResponse};
    use mamaguide_knowledge::KnowledgeDocument;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with a fixed script and records the system prompts it saw.
    pub(crate) struct ScriptedProvider {
        reply: Result<Option<String>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Ok(Some(text.to_string())),
                prompts: Mutex::new(vec![]),
            }
        }

        pub fn failing(err: MamaGuideError) -> Self {
            Self {
                reply: Err(err),
                prompts: Mutex::new(vec![]),
            }
        }

        pub fn silent() -> Self {
            Self {
                reply: Ok(None),
                prompts: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, messages: &[Message], _params: &GenerateParams) -> Result<ProviderResponse> {
            self.prompts.lock().unwrap().push(messages[0].content.clone());
            match &self.reply {
                Ok(content) => Ok(ProviderResponse {
                    content: content.clone(),
                    ..Default::default()
                }),
                Err(MamaGuideError::ApiKeyMissing(name)) => {
                    Err(MamaGuideError::ApiKeyMissing(name.clone()))
                }
                Err(e) => Err(MamaGuideError::Provider(e.to_string())),
            }
        }
    }

    pub(crate) async fn knowledge() -> Arc<KnowledgeService> {
        let svc = KnowledgeService::new(KnowledgeConfig::default(), None);
        let doc = KnowledgeDocument::from_value(
            json!({
                "nutritionalRequirements": {"dailyMacros": [
                    {"nutrient": "Folic Acid", "amount": "600", "unit": "mcg", "category": "vitamins"}
                ]},
                "medications": {"byCondition": [{"condition": "Pain", "medications": [
                    {"drug": "Ibuprofen", "brand": "Advil", "safetyLevel": "Avoid", "note": "Not recommended after 20 weeks."}
                ]}]}
            }),
            "pregnancyKnowledgeGraph",
        )
        .unwrap();
        svc.initialize_with(doc).await;
        Arc::new(svc)
    }

    fn assistant(knowledge: Arc<KnowledgeService>, provider: Option<ScriptedProvider>) -> ChatAssistant {
        ChatAssistant::new(
            knowledge,
            provider.map(|p| Box::new(p) as Box<dyn Provider>),
            GenerateParams::default(),
            5,
        )
    }

    #[tokio::test]
    async fn test_retrieved_context_labels_knowledge_base() {
        // The model claims general knowledge; retrieval wins.
        let provider = ScriptedProvider::replying("[Using general knowledge] Take 600 mcg daily.");
        let bot = assistant(knowledge().await, Some(provider));
        let answer = bot.answer("folic acid").await;

        assert_eq!(answer.provenance, Provenance::KnowledgeBase);
        assert_eq!(answer.content, "Take 600 mcg daily.");
        assert_eq!(answer.section_ids, vec!["nutrition-daily"]);
    }

    #[tokio::test]
    async fn test_no_context_labels_ai_general() {
        // The model claims the knowledge base; nothing was retrieved.
        let provider = ScriptedProvider::replying("[Using pregnancy knowledge base] Sleep on your side.");
        let bot = assistant(knowledge().await, Some(provider));
        let answer = bot.answer("sleeping position").await;

        assert_eq!(answer.provenance, Provenance::AiGeneral);
        assert_eq!(answer.content, "Sleep on your side.");
        assert!(answer.section_ids.is_empty());
    }

    #[tokio::test]
    async fn test_prompt_carries_numbered_context() {
        let provider = Arc::new(ScriptedProvider::replying("ok"));
        let bot = ChatAssistant::new(
            knowledge().await,
            Some(Box::new(SharedProvider(provider.clone()))),
            GenerateParams::default(),
            5,
        );
        bot.answer("advil").await;

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(
            "1. Ibuprofen (Advil) for Pain: Avoid. Not recommended after 20 weeks."
        ));
    }

    struct SharedProvider(Arc<ScriptedProvider>);

    #[async_trait]
    impl Provider for SharedProvider {
        fn name(&self) -> &str {
            self.0.name()
        }

        async fn chat(&self, messages: &[Message], params: &GenerateParams) -> Result<ProviderResponse> {
            self.0.chat(messages, params).await
        }
    }

    #[tokio::test]
    async fn test_missing_provider_is_error() {
        let bot = assistant(knowledge().await, None);
        let answer = bot.answer("folic acid").await;
        assert_eq!(answer.provenance, Provenance::Error);
        assert_eq!(answer.content, NOT_CONFIGURED_MESSAGE);
        assert!(!bot.has_provider());
    }

    #[tokio::test]
    async fn test_missing_api_key_is_error() {
        let provider = ScriptedProvider::failing(MamaGuideError::ApiKeyMissing("openai".into()));
        let answer = assistant(knowledge().await, Some(provider)).answer("iron").await;
        assert_eq!(answer.provenance, Provenance::Error);
        assert_eq!(answer.content, NOT_CONFIGURED_MESSAGE);
    }

    #[tokio::test]
    async fn test_completion_failure_is_error() {
        let provider = ScriptedProvider::failing(MamaGuideError::Http("connection reset".into()));
        let answer = assistant(knowledge().await, Some(provider)).answer("folic acid").await;
        assert_eq!(answer.provenance, Provenance::Error);
        assert_eq!(answer.content, FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn test_empty_completion() {
        let bot = assistant(knowledge().await, Some(ScriptedProvider::silent()));
        let answer = bot.answer("folic acid").await;
        assert_eq!(answer.content, EMPTY_COMPLETION_MESSAGE);
        assert_eq!(answer.provenance, Provenance::KnowledgeBase);

        let marker_only = ScriptedProvider::replying("[Using general knowledge]");
        let answer = assistant(knowledge().await, Some(marker_only)).answer("hello").await;
        assert_eq!(answer.content, EMPTY_COMPLETION_MESSAGE);
        assert_eq!(answer.provenance, Provenance::AiGeneral);
    }

    #[tokio::test]
    async fn test_blank_question() {
        let provider = Arc::new(ScriptedProvider::replying("unused"));
        let bot = ChatAssistant::new(
            knowledge().await,
            Some(Box::new(SharedProvider(provider.clone()))),
            GenerateParams::default(),
            5,
        );
        let answer = bot.answer("   ").await;
        assert_eq!(answer.provenance, Provenance::Error);
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[test]
    fn test_provenance_serializes_kebab_case() {
        assert_eq!(serde_json::to_value(Provenance::KnowledgeBase).unwrap(), "knowledge-base");
        assert_eq!(serde_json::to_value(Provenance::AiGeneral).unwrap(), "ai-general");
        assert_eq!(Provenance::Error.to_string(), "error");
    }
}
