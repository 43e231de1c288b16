//! API route handlers for the gateway.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use mamaguide_assistant::{GREETING, SUGGESTED_QUESTIONS};
use mamaguide_memory::NewSymptomLog;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::server::AppState;

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "mamaguide-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// System information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let kb = &state.knowledge;
    Json(json!({
        "name": "MamaGuide",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "knowledge": {
            "state": kb.state(),
            "sections": kb.section_count(),
            "indexed": kb.is_indexed(),
            "embedding_failures": kb.index_report().map(|r| r.failed.len()),
        },
        "chat_available": state.assistant.has_provider(),
        "gateway": {
            "host": state.gateway_config.host,
            "port": state.gateway_config.port,
        }
    }))
}

// ── Knowledge base ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

pub async fn knowledge_search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Json<Value> {
    let limit = body
        .limit
        .unwrap_or(state.knowledge.config().top_k)
        .clamp(1, 20);
    let (sections, path) = state.knowledge.search(&body.query, limit).await;
    let results: Vec<Value> = sections
        .iter()
        .map(|s| json!({"id": s.id, "content": s.content}))
        .collect();
    Json(json!({"ok": true, "results": results, "count": results.len(), "path": path}))
}

pub async fn week_info(
    State(state): State<Arc<AppState>>,
    Path(week): Path<u32>,
) -> Json<Value> {
    match state.knowledge.week_info(week) {
        Some(info) => Json(json!({"ok": true, "week": week, "info": info})),
        None => Json(json!({"ok": false, "error": format!("No guidance for week {week}")})),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MedicationQuery {
    pub q: Option<String>,
    pub condition: Option<String>,
}

pub async fn medications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MedicationQuery>,
) -> Json<Value> {
    let kb = &state.knowledge;
    let meds = match (&query.condition, &query.q) {
        (Some(condition), q) => kb
            .medications_for_condition(condition)
            .into_iter()
            .filter(|m| {
                q.as_deref().is_none_or(|name| {
                    let name = name.to_lowercase();
                    m.drug.to_lowercase().contains(&name)
                        || m.brand.as_deref().is_some_and(|b| b.to_lowercase().contains(&name))
                })
            })
            .collect(),
        (None, Some(name)) => kb.check_medication_safety(name),
        (None, None) => kb.check_medication_safety(""),
    };
    Json(json!({"ok": true, "medications": meds, "count": meds.len()}))
}

#[derive(Debug, Default, Deserialize)]
pub struct SymptomQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub severity: Option<String>,
}

pub async fn symptoms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SymptomQuery>,
) -> Json<Value> {
    let kb = &state.knowledge;
    let mut found = match &query.q {
        Some(sign) => kb.symptom_info(sign),
        None => kb.symptom_info(""),
    };
    if let Some(category) = &query.category {
        found.retain(|s| {
            s.category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category.trim()))
        });
    }
    if let Some(severity) = &query.severity {
        found.retain(|s| {
            s.severity
                .as_deref()
                .is_some_and(|v| v.eq_ignore_ascii_case(severity.trim()))
        });
    }
    Json(json!({"ok": true, "symptoms": found, "count": found.len()}))
}

pub async fn emergency_symptoms(State(state): State<Arc<AppState>>) -> Json<Value> {
    let found = state.knowledge.emergency_symptoms();
    Json(json!({"ok": true, "symptoms": found, "count": found.len()}))
}

pub async fn topics(State(state): State<Arc<AppState>>) -> Json<Value> {
    let keys = state.knowledge.topic_keys();
    Json(json!({"ok": true, "topics": keys, "count": keys.len()}))
}

pub async fn topic(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Json<Value> {
    match state.knowledge.topic(&key) {
        Some(fragment) => Json(json!({"ok": true, "topic": key, "content": fragment})),
        None => Json(json!({
            "ok": false,
            "error": format!("Unknown topic: {key}"),
            "available": state.knowledge.topic_keys(),
        })),
    }
}

// ── Chat ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Opening message and starter questions for a new conversation.
pub async fn chat_suggestions() -> Json<Value> {
    Json(json!({
        "ok": true,
        "greeting": GREETING,
        "questions": SUGGESTED_QUESTIONS,
    }))
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> Json<Value> {
    let answer = state.assistant.answer(&body.message).await;
    Json(json!({
        "ok": answer.provenance != mamaguide_assistant::Provenance::Error,
        "role": "assistant",
        "content": answer.content,
        "source": answer.provenance,
        "sections": answer.section_ids,
    }))
}

// ── Profile ─────────────────────────────────────────────────

pub async fn get_due_date(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.store.due_date() {
        Ok(due) => Json(json!({"ok": true, "due_date": due})),
        Err(e) => Json(json!({"ok": false, "error": e.to_string()})),
    }
}

#[derive(Debug, Deserialize)]
pub struct DueDateRequest {
    pub due_date: String,
}

pub async fn set_due_date(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DueDateRequest>,
) -> Json<Value> {
    let due = match NaiveDate::parse_from_str(body.due_date.trim(), "%Y-%m-%d") {
        Ok(d) => d,
        Err(e) => {
            return Json(json!({"ok": false, "error": format!("Invalid due date (expected YYYY-MM-DD): {e}")}));
        }
    };
    match state.store.set_due_date(due) {
        Ok(()) => {
            let week = mamaguide_memory::current_week(Some(due), today());
            Json(json!({"ok": true, "due_date": due, "week": week}))
        }
        Err(e) => Json(json!({"ok": false, "error": e.to_string()})),
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub async fn current_week(State(state): State<Arc<AppState>>) -> Json<Value> {
    let week = match state.store.current_week(today()) {
        Ok(w) => w,
        Err(e) => return Json(json!({"ok": false, "error": e.to_string()})),
    };
    Json(json!({
        "ok": true,
        "week": week,
        "info": state.knowledge.week_info(week),
    }))
}

// ── Symptom log ─────────────────────────────────────────────

pub async fn list_symptom_log(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.store.list_symptoms() {
        Ok(entries) => Json(json!({"ok": true, "entries": entries, "count": entries.len()})),
        Err(e) => Json(json!({"ok": false, "error": e.to_string()})),
    }
}

pub async fn add_symptom_log(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewSymptomLog>,
) -> Json<Value> {
    match state.store.add_symptom(body) {
        Ok(entry) => Json(json!({"ok": true, "entry": entry})),
        Err(e) => Json(json!({"ok": false, "error": e.to_string()})),
    }
}

pub async fn delete_symptom_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    match state.store.delete_symptom(&id) {
        Ok(removed) => Json(json!({"ok": removed})),
        Err(e) => Json(json!({"ok": false, "error": e.to_string()})),
    }
}
