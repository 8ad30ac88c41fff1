//! Fire-and-forget analytics endpoints.
//!
//! - POST /api/save-search
//! - POST /api/save-chat-message
//! - POST /api/users/upsert
//!
//! Every endpoint answers `{ ok: true }` no matter what happened; writes
//! run detached and failures only reach the log.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use squidai_core::chat::best_effort::spawn_best_effort;
use squidai_core::telemetry::repository::TelemetryRepository;
use squidai_types::telemetry::{ChatMessageRecord, SearchRecord, UserProfile};

use crate::http::extractors::identity::Identity;
use crate::state::AppState;

fn ok() -> Json<Value> {
    Json(json!({ "ok": true }))
}

fn parse<T: DeserializeOwned>(body: &[u8], kind: &str) -> Option<T> {
    match serde_json::from_slice(body) {
        Ok(record) => Some(record),
        Err(e) => {
            debug!(kind, error = %e, "Ignoring malformed telemetry body");
            None
        }
    }
}

/// POST /api/save-search
pub async fn save_search(State(state): State<AppState>, identity: Identity, body: Bytes) -> Json<Value> {
    let Some(telemetry) = state.telemetry.clone() else {
        return ok();
    };
    let Some(mut record) = parse::<SearchRecord>(&body, "search") else {
        return ok();
    };
    if record.query.trim().is_empty() {
        return ok();
    }
    record.user_id = record.user_id.or(identity.user_id);
    record.user_email = record.user_email.or(identity.email);

    spawn_best_effort("record_search", async move {
        telemetry.record_search(&record).await
    });
    ok()
}

/// POST /api/save-chat-message
pub async fn save_chat_message(
    State(state): State<AppState>,
    identity: Identity,
    body: Bytes,
) -> Json<Value> {
    let Some(telemetry) = state.telemetry.clone() else {
        return ok();
    };
    let Some(mut record) = parse::<ChatMessageRecord>(&body, "chat_message") else {
        return ok();
    };
    record.user_id = record.user_id.or(identity.user_id);
    record.user_email = record.user_email.or(identity.email);

    spawn_best_effort("record_chat_message", async move {
        telemetry.record_chat_message(&record).await
    });
    ok()
}

/// POST /api/users/upsert
pub async fn upsert_user(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let Some(telemetry) = state.telemetry.clone() else {
        return ok();
    };
    let Some(profile) = parse::<UserProfile>(&body, "user") else {
        return ok();
    };
    if profile.id.trim().is_empty() || profile.email.trim().is_empty() {
        return ok();
    }

    spawn_best_effort("upsert_user", async move { telemetry.upsert_user(&profile).await });
    ok()
}
