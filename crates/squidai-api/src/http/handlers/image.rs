//! Image generation endpoint.
//!
//! POST /api/generate-image `{ prompt }` -> `{ imageBase64, mimeType, text? }`

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;

use squidai_types::llm::GeneratedImage;

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: String,
}

/// POST /api/generate-image -- a malformed body counts as an empty prompt.
pub async fn generate_image(
    State(state): State<AppState>,
    body: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<GeneratedImage>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let image = state
        .relay
        .generate_image(&request.prompt)
        .await
        .map_err(AppError::Image)?;
    Ok(Json(image))
}
