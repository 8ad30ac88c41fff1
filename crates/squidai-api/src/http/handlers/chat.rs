//! Streaming chat relay endpoint.
//!
//! POST /api/chat
//!
//! Body: `{ history: [{role, parts}], message, images?: [{mimeType, data}] }`.
//! On success the reply streams back as plain UTF-8 text, fragment by
//! fragment, with no framing. Errors are `{ error, hint? }` JSON.

use axum::body::Body;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::TryStreamExt;

use squidai_core::relay::service::MISSING_CREDENTIAL;
use squidai_types::chat::RelayRequest;
use squidai_types::error::RelayError;

use crate::http::error::AppError;
use crate::state::AppState;

/// POST /api/chat -- relay one turn and stream the reply.
pub async fn relay_chat(
    State(state): State<AppState>,
    body: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = match body {
        Ok(Json(request)) => request,
        // A missing credential is reported ahead of any input problem.
        Err(_) if !state.relay.is_configured() => {
            return Err(RelayError::ConfigurationMissing(MISSING_CREDENTIAL.to_string()).into());
        }
        Err(rejection) => return Err(AppError::Validation(rejection.body_text())),
    };

    let stream = state.relay.relay(request).await?;
    let stream = stream.inspect_err(|e| tracing::warn!(error = %e, "Reply stream interrupted"));

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache, no-transform"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
