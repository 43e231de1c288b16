//! # MamaGuide Providers
//!
//! Completion and embedding clients for MamaGuide.
//!
//! All supported services (OpenAI, OpenRouter, Gemini, Groq, Mistral, Ollama,
//! llama.cpp, vLLM, ...) are handled by a single `OpenAiCompatibleProvider`;
//! a `FailoverProvider` chains several of them for the chat path.

pub mod failover;
pub mod openai_compatible;
pub mod provider_registry;

use std::sync::Arc;
use std::time::Duration;

use mamaguide_core::config::MamaGuideConfig;
use mamaguide_core::error::{MamaGuideError, Result};
use mamaguide_core::traits::{Embedder, Provider};

use openai_compatible::OpenAiCompatibleProvider;

/// Build a single OpenAI-compatible client by provider name.
fn build_client(
    provider_name: &str,
    api_key: &str,
    endpoint: &str,
    timeout: Duration,
) -> Result<OpenAiCompatibleProvider> {
    // Custom endpoint: "custom:https://my-server.com/v1"
    if provider_name.starts_with("custom:") {
        return OpenAiCompatibleProvider::custom(provider_name, api_key, timeout);
    }
    let registry = provider_registry::get_provider_config(provider_name)
        .ok_or_else(|| MamaGuideError::ProviderNotFound(provider_name.into()))?;
    OpenAiCompatibleProvider::from_registry(registry, api_key, endpoint, timeout)
}

/// Create the completion provider from configuration.
///
/// Resolution order for provider name: `[llm].provider`, then `default_provider`.
/// API key: `[llm].api_key` > top-level `api_key` > provider env vars.
/// When `[llm].fallback` lists providers, the result is a failover chain.
pub fn create_provider(config: &MamaGuideConfig) -> Result<Box<dyn Provider>> {
    let timeout = Duration::from_secs(config.llm.timeout_secs);
    let api_key = if !config.llm.api_key.is_empty() {
        config.llm.api_key.as_str()
    } else {
        config.api_key.as_str()
    };

    let primary = build_client(config.llm_provider(), api_key, &config.llm.endpoint, timeout)?;
    if config.llm.fallback.is_empty() {
        return Ok(Box::new(primary));
    }

    let mut chain: Vec<Box<dyn Provider>> = vec![Box::new(primary)];
    for name in &config.llm.fallback {
        // Fallbacks resolve their own keys from the environment.
        match build_client(name, "", "", timeout) {
            Ok(p) => chain.push(Box::new(p)),
            Err(e) => tracing::warn!("⚠️ Skipping fallback provider {name}: {e}"),
        }
    }
    Ok(Box::new(failover::FailoverProvider::new(chain)?))
}

/// Create the embedding service from configuration.
///
/// Returns `Ok(None)` when embeddings are disabled, the provider has no
/// embeddings endpoint, or no credentials are available; retrieval then
/// runs on the textual fallback only.
pub fn create_embedder(config: &MamaGuideConfig) -> Result<Option<Arc<dyn Embedder>>> {
    let emb = &config.embedding;
    if emb.is_disabled() {
        tracing::info!("Embeddings disabled, retrieval will use text search");
        return Ok(None);
    }

    let api_key = if !emb.api_key.is_empty() {
        emb.api_key.as_str()
    } else {
        config.api_key.as_str()
    };
    let client = build_client(
        &emb.provider,
        api_key,
        &emb.endpoint,
        Duration::from_secs(emb.timeout_secs),
    )?
    .with_embedding_model(&emb.model);

    if !client.supports_embeddings() {
        tracing::warn!("⚠️ Provider {} has no embeddings endpoint", emb.provider);
        return Ok(None);
    }
    if !client.has_credentials() {
        tracing::warn!("⚠️ No API key for embedding provider {}", emb.provider);
        return Ok(None);
    }
    Ok(Some(Arc::new(client)))
}

/// List all available provider names.
pub fn available_providers() -> Vec<&'static str> {
    let mut names = provider_registry::all_provider_names();
    names.push("custom");
    names
}
