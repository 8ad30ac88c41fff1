//! Application error type mapping to HTTP status codes and
//! `{ error, hint?, retryAfterMs? }`.
//!
//! 429 responses also carry a `Retry-After` header (whole seconds) when the
//! wait is known.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use squidai_types::error::{RelayError, RepositoryError};
use squidai_types::llm::LlmError;

/// Shown with failures that concern the upstream credential or its reachability.
pub const CREDENTIAL_HINT: &str = "Check GEMINI_API_KEY in .env.local, verify it at https://ai.google.dev/, then restart the server.";

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Relay(RelayError),
    /// Image generation failures are all reported as 500 except bad input.
    Image(RelayError),
    Repository(RepositoryError),
    Validation(String),
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        AppError::Relay(e)
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, String, Option<&'static str>) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Relay(e) | AppError::Image(e) => {
                let (status, message, hint) = relay_parts(e);
                match self {
                    AppError::Image(_) if status != StatusCode::BAD_REQUEST => {
                        (StatusCode::INTERNAL_SERVER_ERROR, message, hint)
                    }
                    _ => (status, message, hint),
                }
            }
            AppError::Repository(RepositoryError::NotFound) => {
                (StatusCode::NOT_FOUND, "Session not found".to_string(), None)
            }
            AppError::Repository(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
                None,
            ),
        }
    }

    /// Suggested wait for a relay rejection: the cooldown remainder, or the
    /// delay the upstream asked for.
    fn retry_after_ms(&self) -> Option<u64> {
        match self {
            AppError::Relay(RelayError::CoolingDown { remaining_ms }) => Some(*remaining_ms),
            AppError::Relay(RelayError::Upstream(LlmError::RateLimited {
                retry_after_ms, ..
            })) => *retry_after_ms,
            _ => None,
        }
    }
}

fn relay_parts(e: &RelayError) -> (StatusCode, String, Option<&'static str>) {
    match e {
        RelayError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
        RelayError::ConfigurationMissing(msg) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            msg.clone(),
            Some(CREDENTIAL_HINT),
        ),
        RelayError::CoolingDown { .. } => (StatusCode::TOO_MANY_REQUESTS, e.to_string(), None),
        RelayError::Upstream(LlmError::RateLimited { message, .. }) => {
            (StatusCode::TOO_MANY_REQUESTS, message.clone(), None)
        }
        RelayError::Upstream(upstream) if upstream.mentions_credential() => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error: {upstream}"),
            Some(CREDENTIAL_HINT),
        ),
        RelayError::Upstream(upstream @ LlmError::NetworkUnreachable(_)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Error: {upstream}"),
            Some(CREDENTIAL_HINT),
        ),
        RelayError::Upstream(upstream) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Error: {upstream}"),
            None,
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, hint) = self.parts();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?self, "Request failed");
        }
        let retry_after_ms = self.retry_after_ms();
        let body = ErrorBody {
            error,
            hint: hint.map(str::to_string),
            retry_after_ms,
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(ms) = retry_after_ms {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, ms.div_ceil(1000).into());
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: AppError) -> StatusCode {
        e.into_response().status()
    }

    #[test]
    fn relay_errors_map_to_statuses() {
        assert_eq!(
            status_of(RelayError::InvalidInput("x".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RelayError::ConfigurationMissing("x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(RelayError::CoolingDown { remaining_ms: 10 }.into()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(
                RelayError::Upstream(LlmError::RateLimited {
                    message: "slow".into(),
                    retry_after_ms: None
                })
                .into()
            ),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_of(RelayError::Upstream(LlmError::AuthenticationFailed("bad".into())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(RelayError::Upstream(LlmError::Stream("cut".into())).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn hints_accompany_credential_and_network_failures() {
        let (_, _, hint) =
            AppError::Relay(RelayError::Upstream(LlmError::NetworkUnreachable("t".into()))).parts();
        assert_eq!(hint, Some(CREDENTIAL_HINT));

        let (_, _, hint) = AppError::Relay(RelayError::Upstream(LlmError::Upstream {
            status: 500,
            message: "boom".into(),
        }))
        .parts();
        assert!(hint.is_none());
    }

    #[test]
    fn image_failures_are_500_except_bad_input() {
        assert_eq!(
            status_of(AppError::Image(RelayError::Upstream(LlmError::RateLimited {
                message: "slow".into(),
                retry_after_ms: Some(1000)
            }))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Image(RelayError::InvalidInput("x".into()))),
            StatusCode::BAD_REQUEST
        );
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn upstream_rate_limit_carries_suggested_wait() {
        let response = AppError::Relay(RelayError::Upstream(LlmError::RateLimited {
            message: "Resource has been exhausted".into(),
            retry_after_ms: Some(41_000),
        }))
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "41");
        let body = body_json(response).await;
        assert_eq!(body["error"], "Resource has been exhausted");
        assert_eq!(body["retryAfterMs"], 41_000);
    }

    #[tokio::test]
    async fn cooldown_rounds_retry_after_up() {
        let response = AppError::Relay(RelayError::CoolingDown { remaining_ms: 3_200 }).into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "4");
        assert_eq!(body_json(response).await["retryAfterMs"], 3_200);
    }

    #[tokio::test]
    async fn other_errors_omit_retry_after() {
        let response = AppError::Image(RelayError::Upstream(LlmError::RateLimited {
            message: "slow".into(),
            retry_after_ms: Some(1000),
        }))
        .into_response();
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
        assert!(body_json(response).await.get("retryAfterMs").is_none());
    }

    #[test]
    fn repository_not_found_is_404() {
        assert_eq!(
            status_of(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RepositoryError::Query("x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
