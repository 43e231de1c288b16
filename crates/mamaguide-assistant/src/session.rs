//! A chat transcript bound to an assistant.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mamaguide_core::types::Role;
use serde::{Deserialize, Serialize};

use crate::{Answer, ChatAssistant, Provenance};

pub const GREETING: &str = "Hello! I'm your pregnancy assistant powered by a comprehensive medical knowledge base. I can help you with:

• Symptoms and when to call your provider
• Medication safety during pregnancy
• Nutritional requirements and food safety
• Labor and delivery information
• Exercise guidelines
• Baby gear safety
• Common pregnancy questions

What would you like to know about your pregnancy journey?";

pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "What medications are safe during pregnancy?",
    "What are the signs of labor?",
    "What foods should I avoid?",
    "When should I call my doctor?",
    "What exercise is safe during pregnancy?",
    "What should I pack in my hospital bag?",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    /// Set on assistant turns only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Provenance>,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            source: None,
            timestamp: Utc::now(),
        }
    }

    fn assistant(content: impl Into<String>, source: Provenance) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            source: Some(source),
            timestamp: Utc::now(),
        }
    }
}

pub struct ChatSession {
    assistant: Arc<ChatAssistant>,
    transcript: Vec<ChatTurn>,
}

impl ChatSession {
    /// New session opening with the greeting.
    pub fn new(assistant: Arc<ChatAssistant>) -> Self {
        Self {
            assistant,
            transcript: vec![ChatTurn::assistant(GREETING, Provenance::KnowledgeBase)],
        }
    }

    /// Send a message. Blank input is ignored and returns `None`.
    pub async fn send(&mut self, input: &str) -> Option<Answer> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        self.transcript.push(ChatTurn::user(input));
        let answer = self.assistant.answer(input).await;
        self.transcript
            .push(ChatTurn::assistant(answer.content.clone(), answer.provenance));
        Some(answer)
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    pub fn suggested_questions(&self) -> &'static [&'static str] {
        SUGGESTED_QUESTIONS
    }

    /// The `n`th suggested question, counting from 1.
    pub fn suggestion(&self, n: usize) -> Option<&'static str> {
        n.checked_sub(1).and_then(|i| SUGGESTED_QUESTIONS.get(i)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{ScriptedProvider, knowledge};
    use mamaguide_core::error::MamaGuideError;
    use mamaguide_core::traits::{GenerateParams, Provider};

    async fn session(provider: ScriptedProvider) -> ChatSession {
        let bot = ChatAssistant::new(
            knowledge().await,
            Some(Box::new(provider) as Box<dyn Provider>),
            GenerateParams::default(),
            5,
        );
        ChatSession::new(Arc::new(bot))
    }

    #[tokio::test]
    async fn test_session_starts_with_greeting() {
        let chat = session(ScriptedProvider::replying("hi")).await;
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transcript()[0].role, Role::Assistant);
        assert_eq!(chat.transcript()[0].source, Some(Provenance::KnowledgeBase));
        assert_eq!(chat.suggested_questions().len(), 6);
    }

    #[tokio::test]
    async fn test_send_records_both_turns() {
        let mut chat = session(ScriptedProvider::replying("[Using pregnancy knowledge base] 600 mcg.")).await;
        let answer = chat.send("  folic acid  ").await.unwrap();
        assert_eq!(answer.provenance, Provenance::KnowledgeBase);

        let turns = chat.transcript();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(turns[1].content, "folic acid");
        assert_eq!(turns[1].source, None);
        assert_eq!(turns[2].content, "600 mcg.");
        assert_eq!(turns[2].source, Some(Provenance::KnowledgeBase));
    }

    #[tokio::test]
    async fn test_suggestion_by_number() {
        let chat = session(ScriptedProvider::replying("unused")).await;
        assert_eq!(chat.suggestion(1), Some(SUGGESTED_QUESTIONS[0]));
        assert_eq!(chat.suggestion(6), Some("What should I pack in my hospital bag?"));
        assert_eq!(chat.suggestion(0), None);
        assert_eq!(chat.suggestion(7), None);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let mut chat = session(ScriptedProvider::replying("unused")).await;
        assert!(chat.send("   ").await.is_none());
        assert_eq!(chat.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_error_turn_keeps_transcript() {
        let mut chat = session(ScriptedProvider::failing(MamaGuideError::Http("down".into()))).await;
        chat.send("folic acid").await;
        chat.send("iron").await;

        let turns = chat.transcript();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[2].source, Some(Provenance::Error));
        assert_eq!(turns[4].source, Some(Provenance::Error));
    }

    #[test]
    fn test_turn_serializes_source() {
        let turn = ChatTurn::assistant("ok", Provenance::AiGeneral);
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["source"], "ai-general");
        let user = serde_json::to_value(ChatTurn::user("q")).unwrap();
        assert!(user.get("source").is_none());
    }
}
