//! MamaGuide configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MamaGuideError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MamaGuideConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String { "openai".into() }
fn default_model() -> String { "gpt-3.5-turbo".into() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 600 }

impl Default for MamaGuideConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            knowledge: KnowledgeConfig::default(),
            memory: MemoryConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl MamaGuideConfig {
    /// Load config from the default path (~/.mamaguide/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MamaGuideError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| MamaGuideError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save config to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| MamaGuideError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the MamaGuide home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mamaguide")
    }

    /// Completion provider name: `[llm].provider` wins over the top-level field.
    pub fn llm_provider(&self) -> &str {
        if !self.llm.provider.is_empty() {
            &self.llm.provider
        } else {
            &self.default_provider
        }
    }

    /// Completion model: `[llm].model` wins over the top-level field.
    pub fn llm_model(&self) -> &str {
        if !self.llm.model.is_empty() {
            &self.llm.model
        } else {
            &self.default_model
        }
    }
}

/// Completion (chat) provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Providers tried in order when the primary fails.
    #[serde(default)]
    pub fallback: Vec<String>,
}

fn default_llm_timeout() -> u64 { 60 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: String::new(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_llm_timeout(),
            fallback: vec![],
        }
    }
}

/// Embedding service configuration. `provider = "none"` disables vector search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_provider() -> String { "openai".into() }
fn default_embedding_model() -> String { "text-embedding-ada-002".into() }
fn default_embedding_timeout() -> u64 { 30 }

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key: String::new(),
            endpoint: String::new(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_disabled(&self) -> bool {
        self.provider.is_empty() || self.provider.eq_ignore_ascii_case("none")
    }
}

/// Knowledge base and retrieval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// File path or http(s) URL of the knowledge document.
    #[serde(default = "default_knowledge_source")]
    pub source: String,
    /// Wrapper key unwrapped from the document root when present.
    #[serde(default = "default_root_key")]
    pub root_key: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_chat_top_k")]
    pub chat_top_k: usize,
    /// Minimum cosine similarity (exclusive) for a vector match.
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,
}

fn default_knowledge_source() -> String { "data/knowledgeBase.json".into() }
fn default_root_key() -> String { "pregnancyKnowledgeGraph".into() }
fn default_top_k() -> usize { 3 }
fn default_chat_top_k() -> usize { 5 }
fn default_relevance_threshold() -> f32 { 0.3 }

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            source: default_knowledge_source(),
            root_key: default_root_key(),
            top_k: default_top_k(),
            chat_top_k: default_chat_top_k(),
            relevance_threshold: default_relevance_threshold(),
        }
    }
}

/// Local persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String { "~/.mamaguide/mamaguide.db".into() }

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

impl MemoryConfig {
    /// `db_path` with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).to_string())
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 { 3000 }
fn default_host() -> String { "127.0.0.1".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MamaGuideConfig::default();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.default_model, "gpt-3.5-turbo");
        assert!((config.default_temperature - 0.7).abs() < 0.01);
        assert_eq!(config.max_tokens, 600);
        assert_eq!(config.knowledge.top_k, 3);
        assert_eq!(config.knowledge.chat_top_k, 5);
        assert!((config.knowledge.relevance_threshold - 0.3).abs() < 1e-6);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            default_provider = "ollama"
            default_model = "llama3.2"

            [embedding]
            provider = "none"

            [knowledge]
            source = "https://example.com/knowledgeBase.json"
            chat_top_k = 8
        "#;

        let config: MamaGuideConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_provider, "ollama");
        assert_eq!(config.llm_model(), "llama3.2");
        assert!(config.embedding.is_disabled());
        assert_eq!(config.knowledge.source, "https://example.com/knowledgeBase.json");
        assert_eq!(config.knowledge.chat_top_k, 8);
        assert_eq!(config.knowledge.top_k, 3);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: MamaGuideConfig = toml::from_str("").unwrap();
        assert_eq!(config.default_provider, "openai");
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.knowledge.root_key, "pregnancyKnowledgeGraph");
        assert!(!config.embedding.is_disabled());
    }

    #[test]
    fn test_llm_section_overrides_top_level() {
        let toml_str = r#"
            default_provider = "openai"
            [llm]
            provider = "groq"
            model = "llama-3.1-8b-instant"
        "#;
        let config: MamaGuideConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm_provider(), "groq");
        assert_eq!(config.llm_model(), "llama-3.1-8b-instant");
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("mamaguide-config-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");
        let mut config = MamaGuideConfig::default();
        config.default_provider = "ollama".into();
        config.knowledge.chat_top_k = 7;
        config.save_to(&path).unwrap();

        let loaded = MamaGuideConfig::load_from(&path).unwrap();
        assert_eq!(loaded.default_provider, "ollama");
        assert_eq!(loaded.knowledge.chat_top_k, 7);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_home_dir() {
        let home = MamaGuideConfig::home_dir();
        assert!(home.to_string_lossy().contains("mamaguide"));
    }
}
