//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use mamaguide_assistant::ChatAssistant;
use mamaguide_core::config::{GatewayConfig, MamaGuideConfig};
use mamaguide_knowledge::KnowledgeService;
use mamaguide_memory::SqliteStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub gateway_config: GatewayConfig,
    pub start_time: std::time::Instant,
    pub knowledge: Arc<KnowledgeService>,
    pub assistant: Arc<ChatAssistant>,
    pub store: Arc<SqliteStore>,
}

impl AppState {
    pub fn new(
        gateway_config: GatewayConfig,
        knowledge: Arc<KnowledgeService>,
        assistant: Arc<ChatAssistant>,
        store: Arc<SqliteStore>,
    ) -> Self {
        Self {
            gateway_config,
            start_time: std::time::Instant::now(),
            knowledge,
            assistant,
            store,
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/health", get(routes::health_check))
        .route("/api/v1/info", get(routes::system_info))
        // Knowledge base
        .route("/api/v1/knowledge/search", post(routes::knowledge_search))
        .route("/api/v1/weeks/{week}", get(routes::week_info))
        .route("/api/v1/medications", get(routes::medications))
        .route("/api/v1/symptoms", get(routes::symptoms))
        .route("/api/v1/symptoms/emergency", get(routes::emergency_symptoms))
        .route("/api/v1/topics", get(routes::topics))
        .route("/api/v1/topics/{key}", get(routes::topic))
        // Chat
        .route("/api/v1/chat", post(routes::chat))
        .route("/api/v1/chat/suggestions", get(routes::chat_suggestions))
        // Profile
        .route(
            "/api/v1/profile/due-date",
            get(routes::get_due_date).put(routes::set_due_date),
        )
        .route("/api/v1/profile/week", get(routes::current_week))
        // Symptom log
        .route(
            "/api/v1/symptom-log",
            get(routes::list_symptom_log).post(routes::add_symptom_log),
        )
        .route("/api/v1/symptom-log/{id}", delete(routes::delete_symptom_log))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .allow_origin(Any)
                .max_age(std::time::Duration::from_secs(3600)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server. Knowledge indexing runs in the background; until it
/// settles, searches are answered by substring matching.
pub async fn start(config: &MamaGuideConfig) -> anyhow::Result<()> {
    let embedder = match mamaguide_providers::create_embedder(config) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("⚠️ Embedding service unavailable: {e}");
            None
        }
    };

    let knowledge = Arc::new(KnowledgeService::from_config(config, embedder));
    tokio::spawn({
        let knowledge = knowledge.clone();
        async move { knowledge.initialize().await }
    });

    let assistant = Arc::new(ChatAssistant::from_config(config, knowledge.clone()));
    let store = Arc::new(SqliteStore::from_config(&config.memory)?);

    let state = AppState::new(config.gateway.clone(), knowledge, assistant, store);
    let app = build_router(state);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
