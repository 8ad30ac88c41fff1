//! Session CRUD handlers.
//!
//! Endpoints:
//! - GET    /api/sessions            - List the caller's sessions, most recent first
//! - POST   /api/sessions            - `{ action, ... }` with action one of
//!   `create`, `update`, `addMessage`, `rename`, `sync`
//! - DELETE /api/sessions?id=...     - Delete one session
//! - DELETE /api/sessions?all=true   - Delete all of the caller's sessions

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{Value, json};

use squidai_types::chat::{ConversationTurn, Session};

use crate::http::error::AppError;
use crate::http::extractors::identity::Identity;
use crate::state::AppState;

/// Body of `POST /api/sessions`. Which fields are required depends on `action`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCommand {
    #[serde(default)]
    pub action: String,
    pub session: Option<Session>,
    pub session_id: Option<String>,
    pub message: Option<ConversationTurn>,
    pub title: Option<String>,
    pub sessions: Option<Vec<Session>>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
    pub all: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Value>, AppError> {
    let sessions = state.sessions.list_sessions(identity.user_id()).await?;
    Ok(Json(json!({ "sessions": sessions })))
}

/// POST /api/sessions
pub async fn mutate_sessions(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<SessionCommand>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(command) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let user_id = identity.user_id();
    let service = &state.sessions;

    match command.action.as_str() {
        "create" | "update" => {
            let session = command
                .session
                .ok_or_else(|| AppError::Validation("Session data required".to_string()))?;
            service.upsert_session(user_id, &session).await?;
        }
        "addMessage" => {
            let (Some(session_id), Some(message)) = (non_empty(command.session_id), command.message)
            else {
                return Err(AppError::Validation(
                    "Session ID and message required".to_string(),
                ));
            };
            service.append_message(user_id, &session_id, &message).await?;
        }
        "rename" => {
            let (Some(session_id), Some(title)) =
                (non_empty(command.session_id), non_empty(command.title))
            else {
                return Err(AppError::Validation(
                    "Session ID and title required".to_string(),
                ));
            };
            service.rename_session(user_id, &session_id, &title).await?;
        }
        "sync" => {
            let sessions = command
                .sessions
                .ok_or_else(|| AppError::Validation("Sessions array required".to_string()))?;
            service.sync(user_id, &sessions).await?;
        }
        _ => return Err(AppError::Validation("Invalid action".to_string())),
    }

    let sessions = service.list_sessions(user_id).await?;
    Ok(Json(json!({ "success": true, "sessions": sessions })))
}

/// DELETE /api/sessions
pub async fn delete_sessions(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<Value>, AppError> {
    if query.all.as_deref() == Some("true") {
        state.sessions.clear_all(identity.user_id()).await?;
        return Ok(Json(json!({ "success": true })));
    }

    let session_id = non_empty(query.id)
        .ok_or_else(|| AppError::Validation("Session ID required".to_string()))?;
    state
        .sessions
        .delete_session(identity.user_id(), &session_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}
