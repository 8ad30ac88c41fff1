//! Upstream completion request/response types for SquidAI.
//!
//! These types model what the relay hands to a completion provider and the
//! conditions a provider can fail with.

use serde::{Deserialize, Serialize};

use crate::chat::{AttachedInput, HistoryEntry};

/// Message sent upstream when a request carries images but no text.
pub const DEFAULT_IMAGE_PROMPT: &str =
    "What do you see in these images? Please describe or answer any question about them.";

/// A single conversation turn for the upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Prior turns, oldest first. Providers may keep only the most recent few.
    pub history: Vec<HistoryEntry>,
    /// The new user message.
    pub message: String,
    /// Inline attachments for the new message.
    #[serde(default)]
    pub attachments: Vec<AttachedInput>,
}

/// Result of an image generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub image_base64: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Errors from upstream provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    /// Timeout or connection failure; no HTTP status was received.
    #[error("{0}")]
    NetworkUnreachable(String),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after_ms: Option<u64>,
    },

    #[error("upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("{0}")]
    EmptyResponse(String),
}

impl LlmError {
    /// Whether the failure concerns the configured credential.
    pub fn mentions_credential(&self) -> bool {
        match self {
            LlmError::AuthenticationFailed(_) => true,
            LlmError::NetworkUnreachable(_) => false,
            other => other.to_string().to_lowercase().contains("api key"),
        }
    }
}
