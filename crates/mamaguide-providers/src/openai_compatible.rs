//! Unified OpenAI-compatible provider.
//!
//! One struct handles chat completions and embeddings for every
//! OpenAI-compatible API. Providers are distinguished only by endpoint URL,
//! auth style, and API key.

use std::time::Duration;

use async_trait::async_trait;
use mamaguide_core::error::{MamaGuideError, Result};
use mamaguide_core::traits::{Embedder, GenerateParams, Provider};
use mamaguide_core::types::{Embedding, Message, ProviderResponse, Usage};
use serde_json::{Value, json};

use crate::provider_registry::{AuthStyle, ProviderConfig};

/// A unified provider that works with any OpenAI-compatible API.
pub struct OpenAiCompatibleProvider {
    /// Provider name (e.g., "openai", "groq", "ollama").
    name: String,
    /// API key for authentication.
    api_key: String,
    /// Base URL for the API (e.g., "https://api.openai.com/v1").
    base_url: String,
    /// Path for chat completions (e.g., "/chat/completions").
    chat_path: String,
    /// Path for embeddings, when the provider serves them.
    embeddings_path: Option<String>,
    /// Model used by `embed`.
    embedding_model: String,
    /// Authentication style.
    auth_style: AuthStyle,
    /// HTTP client.
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create from a known provider config.
    ///
    /// Resolution order:
    /// - API key: explicit `api_key` > registry env vars > empty
    /// - Base URL: explicit `endpoint` > env override > registry default
    pub fn from_registry(
        registry: &ProviderConfig,
        api_key: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = if !api_key.is_empty() {
            api_key.to_string()
        } else {
            registry
                .env_keys
                .iter()
                .find_map(|key| std::env::var(key).ok())
                .unwrap_or_default()
        };

        let base_url = if !endpoint.is_empty() {
            endpoint.trim_end_matches('/').to_string()
        } else {
            registry
                .base_url_env
                .and_then(|env_key| {
                    let val = std::env::var(env_key).ok()?;
                    // For OLLAMA_HOST / LLAMACPP_HOST, append /v1 if not present
                    if val.ends_with("/v1") {
                        Some(val)
                    } else {
                        Some(format!("{}/v1", val.trim_end_matches('/')))
                    }
                })
                .unwrap_or_else(|| registry.base_url.to_string())
        };

        Ok(Self {
            name: registry.name.to_string(),
            api_key,
            base_url,
            chat_path: registry.chat_path.to_string(),
            embeddings_path: registry.embeddings_path.map(String::from),
            embedding_model: String::new(),
            auth_style: registry.auth_style,
            client: build_client(timeout)?,
        })
    }

    /// Create for a custom endpoint (e.g., "custom:https://my-server.com/v1").
    pub fn custom(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = endpoint
            .strip_prefix("custom:")
            .unwrap_or(endpoint)
            .trim_end_matches('/')
            .to_string();

        let api_key = if !api_key.is_empty() {
            api_key.to_string()
        } else {
            std::env::var("CUSTOM_API_KEY").unwrap_or_default()
        };

        let auth_style = if api_key.is_empty() {
            AuthStyle::None
        } else {
            AuthStyle::Bearer
        };

        Ok(Self {
            name: "custom".to_string(),
            api_key,
            base_url,
            chat_path: "/chat/completions".to_string(),
            embeddings_path: Some("/embeddings".to_string()),
            embedding_model: String::new(),
            auth_style,
            client: build_client(timeout)?,
        })
    }

    /// Set the model used for embedding requests.
    pub fn with_embedding_model(mut self, model: &str) -> Self {
        self.embedding_model = model.to_string();
        self
    }

    /// Whether requests can be sent at all (key present when one is needed).
    pub fn has_credentials(&self) -> bool {
        self.auth_style == AuthStyle::None || !self.api_key.is_empty()
    }

    /// Whether this provider exposes an embeddings endpoint.
    pub fn supports_embeddings(&self) -> bool {
        self.embeddings_path.is_some()
    }

    /// Build the auth header for the request.
    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_style {
            AuthStyle::Bearer if !self.api_key.is_empty() => {
                req.header("Authorization", format!("Bearer {}", self.api_key))
            }
            _ => req,
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body);
        let req = self.apply_auth(req);

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                MamaGuideError::Http(format!("{} request timed out ({})", self.name, url))
            } else {
                MamaGuideError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(MamaGuideError::Provider(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        resp.json()
            .await
            .map_err(|e| MamaGuideError::Http(e.to_string()))
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| MamaGuideError::Http(format!("Failed to build HTTP client: {e}")))
}

/// Build a chat completion request body in OpenAI format.
pub fn chat_request_body(messages: &[Message], params: &GenerateParams) -> Value {
    json!({
        "model": params.model,
        "temperature": params.temperature,
        "max_tokens": params.max_tokens,
        "messages": messages,
    })
}

/// Parse a chat completion response in OpenAI format.
pub fn parse_chat_response(json: &Value) -> Result<ProviderResponse> {
    let choice = json["choices"]
        .get(0)
        .ok_or_else(|| MamaGuideError::Provider("No choices in response".into()))?;

    let content = choice["message"]["content"].as_str().map(String::from);

    let usage = json["usage"].as_object().map(|u| Usage {
        prompt_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: u
            .get("completion_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        total_tokens: u.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
    });

    Ok(ProviderResponse {
        content,
        finish_reason: choice["finish_reason"].as_str().map(String::from),
        usage,
    })
}

/// Parse the first vector out of an embeddings response.
pub fn parse_embedding_response(json: &Value) -> Result<Embedding> {
    let values = json["data"]
        .get(0)
        .and_then(|d| d["embedding"].as_array())
        .ok_or_else(|| MamaGuideError::Embedding("No embedding in response".into()))?;

    let vector: Embedding = values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();

    if vector.is_empty() || vector.len() != values.len() {
        return Err(MamaGuideError::Embedding(
            "Embedding contains non-numeric values".into(),
        ));
    }
    Ok(vector)
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, messages: &[Message], params: &GenerateParams) -> Result<ProviderResponse> {
        if !self.has_credentials() {
            return Err(MamaGuideError::ApiKeyMissing(self.name.clone()));
        }

        let body = chat_request_body(messages, params);
        let json = self.post_json(&self.chat_path, &body).await?;
        let response = parse_chat_response(&json)?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                "{} completion: {} prompt + {} completion tokens",
                self.name,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }
        Ok(response)
    }

    async fn health_check(&self) -> Result<bool> {
        if self.auth_style != AuthStyle::None {
            // For cloud providers, just check if API key is set
            return Ok(!self.api_key.is_empty());
        }

        // For local servers (ollama, llamacpp), try to connect
        let resp = self.client.get(&self.base_url).send().await;
        Ok(resp.is_ok())
    }
}

#[async_trait]
impl Embedder for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        if !self.has_credentials() {
            return Err(MamaGuideError::ApiKeyMissing(self.name.clone()));
        }
        let path = self.embeddings_path.as_deref().ok_or_else(|| {
            MamaGuideError::Embedding(format!("{} has no embeddings endpoint", self.name))
        })?;

        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });
        let json = self.post_json(path, &body).await?;
        parse_embedding_response(&json)
    }
}
