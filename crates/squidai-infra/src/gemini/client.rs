//! GeminiProvider -- concrete [`CompletionProvider`] for Google Gemini.
//!
//! Text replies stream from `v1/models/{model}:streamGenerateContent`
//! (requested as server-sent events); images come from
//! `v1beta/models/{image_model}:generateContent`.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and only exposed in
//! the `x-goog-api-key` request header, so it never appears in URLs, logs,
//! or error messages.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use squidai_core::llm::provider::{CompletionProvider, TextStream};
use squidai_types::chat::TurnRole;
use squidai_types::config::UpstreamConfig;
use squidai_types::llm::{CompletionRequest, GeneratedImage, LlmError};

use super::error::classify_error;
use super::streaming::{normalize_body, shape_from_content_type};
use super::types::{Content, GenerateContentRequest, GenerationConfig, ImageResponse, InlineData, Part};

/// Fixed instruction sent ahead of every conversation.
pub const PERSONA: &str = "You are SquidAI, a coding assistant. You can understand and answer questions about images when the user attaches them.";

const UNREACHABLE: &str = "Could not reach Gemini API. Check: 1) GEMINI_API_KEY is set, 2) internet/firewall, 3) https://ai.google.dev/ for key validity.";

const IMAGE_RATE_LIMITED: &str = "Rate limit exceeded (quota). Wait about 30 seconds and try again, or check your plan and billing: https://ai.google.dev/gemini-api/docs/rate-limits";

/// Google Gemini provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    image_model: String,
    history_limit: usize,
    text_timeout: Duration,
    image_timeout: Duration,
    max_retry_delay: Duration,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, config: &UpstreamConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.text_timeout_secs))
            .build()
            .map_err(|e| LlmError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            image_model: config.image_model.clone(),
            history_limit: config.history_limit,
            text_timeout: Duration::from_secs(config.text_timeout_secs),
            image_timeout: Duration::from_secs(config.image_timeout_secs),
            max_retry_delay: Duration::from_millis(config.max_retry_delay_ms),
        })
    }

    /// Override the API base URL (tests point this at a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn image_model(&self) -> &str {
        &self.image_model
    }

    fn text_url(&self) -> String {
        format!(
            "{}/v1/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn image_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.image_model
        )
    }

    /// Build the request body: persona, recent history, then the new message
    /// with its attachments ahead of the text.
    pub fn to_gemini_request(&self, request: &CompletionRequest) -> GenerateContentRequest {
        let skip = request.history.len().saturating_sub(self.history_limit);
        let mut contents = Vec::with_capacity(request.history.len() - skip + 2);
        contents.push(Content::text("user", PERSONA));
        contents.extend(request.history[skip..].iter().map(|entry| {
            let role = match entry.role {
                TurnRole::Model => "model",
                TurnRole::User => "user",
            };
            Content::text(role, entry.parts.clone())
        }));

        let mut parts: Vec<Part> = request
            .attachments
            .iter()
            .map(|a| Part::InlineData {
                inline_data: InlineData {
                    mime_type: a.mime_type.clone(),
                    data: a.data.clone(),
                },
            })
            .collect();
        parts.push(Part::Text {
            text: request.message.clone(),
        });
        contents.push(Content {
            role: "user".to_string(),
            parts,
        });

        GenerateContentRequest {
            contents,
            generation_config: None,
        }
    }

    async fn request_image(&self, prompt: &str) -> Result<GeneratedImage, LlmError> {
        let body = GenerateContentRequest {
            contents: vec![Content::text("user", prompt)],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            }),
        };

        let response = self
            .client
            .post(self.image_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .timeout(self.image_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e.without_url(), "Gemini image request failed");
                LlmError::NetworkUnreachable(
                    "Could not reach Gemini API for image generation. Check GEMINI_API_KEY and network."
                        .to_string(),
                )
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Stream(e.without_url().to_string()))?;
        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text));
        }

        let parsed: ImageResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::Deserialization(format!("failed to parse image response: {e}")))?;
        extract_image(parsed)
    }
}

/// Pick the image (and any caption text) out of the first candidate.
fn extract_image(response: ImageResponse) -> Result<GeneratedImage, LlmError> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            LlmError::EmptyResponse(
                "No image in Gemini response. The model may not support image generation with your API key or region."
                    .to_string(),
            )
        })?;

    let mut image: Option<(String, String)> = None;
    let mut caption = String::new();
    for part in parts {
        match (part.inline_data, part.text) {
            (Some(data), _) if data.data.as_deref().is_some_and(|d| !d.is_empty()) => {
                let mime = data.mime_type.unwrap_or_else(|| "image/png".to_string());
                image = data.data.map(|d| (d, mime));
            }
            (_, Some(text)) => caption.push_str(&text),
            _ => {}
        }
    }

    let (image_base64, mime_type) = image.ok_or_else(|| {
        LlmError::EmptyResponse(
            "No image data in response. Try a different prompt or check model availability."
                .to_string(),
        )
    })?;
    let caption = caption.trim();
    Ok(GeneratedImage {
        image_base64,
        mime_type,
        text: (!caption.is_empty()).then(|| caption.to_string()),
    })
}

impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(&self, request: CompletionRequest) -> Result<TextStream, LlmError> {
        let body = self.to_gemini_request(&request);

        let send = self
            .client
            .post(self.text_url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send();

        // Bound the wait for response headers only; the body may stream for longer.
        let response = match tokio::time::timeout(self.text_timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e.without_url(), "Gemini request failed");
                return Err(LlmError::NetworkUnreachable(UNREACHABLE.to_string()));
            }
            Err(_) => {
                warn!(timeout_secs = self.text_timeout.as_secs(), "Gemini request timed out");
                return Err(LlmError::NetworkUnreachable(UNREACHABLE.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let err = classify_error(status.as_u16(), &error_body);
            warn!(status = status.as_u16(), error = %err, "Gemini returned an error");
            return Err(err);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(content_type = ?content_type, "Gemini stream opened");

        let declared = shape_from_content_type(content_type.as_deref());
        let body = response.bytes_stream();
        Ok(normalize_body(
            futures_util::StreamExt::map(body, |r| r.map_err(|e| e.without_url())),
            declared,
        ))
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, LlmError> {
        match self.request_image(prompt).await {
            Err(LlmError::RateLimited {
                retry_after_ms: Some(wait_ms),
                ..
            }) if Duration::from_millis(wait_ms) <= self.max_retry_delay => {
                info!(wait_ms, "Image generation rate limited, retrying once");
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                self.request_image(prompt).await.map_err(friendly_image_error)
            }
            other => other.map_err(friendly_image_error),
        }
    }
}

fn friendly_image_error(err: LlmError) -> LlmError {
    match err {
        LlmError::RateLimited { retry_after_ms, .. } => LlmError::RateLimited {
            message: IMAGE_RATE_LIMITED.to_string(),
            retry_after_ms,
        },
        other => other,
    }
}
