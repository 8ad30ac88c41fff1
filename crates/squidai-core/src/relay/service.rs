//! The chat relay: validate, throttle, then stream from the provider.
//!
//! Checks run in a fixed order: credential, input, cooldown. A request that
//! fails validation never consumes the cooldown window; an accepted request
//! claims the window before the upstream call is made.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{Instrument, debug, info, info_span, warn};

use squidai_types::chat::RelayRequest;
use squidai_types::error::RelayError;
use squidai_types::llm::{CompletionRequest, DEFAULT_IMAGE_PROMPT, GeneratedImage};

use crate::llm::provider::{CompletionProvider, StreamInSpan, TextStream};
use crate::relay::cooldown::CooldownGate;

pub const MISSING_CREDENTIAL: &str = "GEMINI_API_KEY is not configured on the server";

/// Rate-limited front for a [`CompletionProvider`].
///
/// `provider` is `None` when the server started without a credential; every
/// call then fails with `ConfigurationMissing`.
pub struct ChatRelay<P: CompletionProvider> {
    provider: Option<P>,
    cooldown: Arc<CooldownGate>,
}

impl<P: CompletionProvider> ChatRelay<P> {
    pub fn new(provider: Option<P>, cooldown: Arc<CooldownGate>) -> Self {
        Self { provider, cooldown }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Option<&P> {
        self.provider.as_ref()
    }

    pub fn cooldown(&self) -> &CooldownGate {
        &self.cooldown
    }

    /// Accept one conversation turn and start streaming the reply.
    pub async fn relay(&self, request: RelayRequest) -> Result<TextStream, RelayError> {
        let provider = self.require_provider()?;
        let completion = validate(request)?;

        if let Err(remaining) = self.cooldown.try_acquire() {
            debug!(remaining_ms = remaining.as_millis() as u64, "Relay request throttled");
            return Err(RelayError::CoolingDown {
                remaining_ms: remaining.as_millis() as u64,
            });
        }

        info!(
            provider = provider.name(),
            model = provider.model(),
            history = completion.history.len(),
            attachments = completion.attachments.len(),
            "Relaying chat request"
        );

        let span = info_span!(
            "gen_ai.chat",
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = provider.name(),
            gen_ai.request.model = provider.model(),
            gen_ai.request.stream = true,
        );
        let stream = provider
            .stream(completion)
            .instrument(span.clone())
            .await
            .map_err(|e| {
                warn!(error = %e, "Upstream completion failed");
                RelayError::from(e)
            })?;
        Ok(Box::pin(StreamInSpan::new(stream, span)))
    }

    /// Generate an image from a prompt. Not subject to the relay cooldown.
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, RelayError> {
        let provider = self.require_provider()?;
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(RelayError::InvalidInput(
                "Prompt is required (e.g. 'a BMW car')".to_string(),
            ));
        }

        info!(provider = provider.name(), "Generating image");
        let span = info_span!(
            "gen_ai.generate_image",
            gen_ai.operation.name = "generate_content",
            gen_ai.provider.name = provider.name(),
        );
        provider
            .generate_image(prompt)
            .instrument(span)
            .await
            .map_err(|e| {
                warn!(error = %e, "Image generation failed");
                RelayError::from(e)
            })
    }

    fn require_provider(&self) -> Result<&P, RelayError> {
        self.provider
            .as_ref()
            .ok_or_else(|| RelayError::ConfigurationMissing(MISSING_CREDENTIAL.to_string()))
    }
}

/// Turn a wire request into a provider request, rejecting malformed input.
pub fn validate(request: RelayRequest) -> Result<CompletionRequest, RelayError> {
    let message = request.message.trim();
    if message.is_empty() && request.images.is_empty() {
        return Err(RelayError::InvalidInput(
            "Message or images required".to_string(),
        ));
    }

    for (index, image) in request.images.iter().enumerate() {
        if image.mime_type.trim().is_empty() {
            return Err(RelayError::InvalidInput(format!(
                "Image {index} is missing a mime type"
            )));
        }
        if STANDARD.decode(image.data.as_bytes()).is_err() {
            return Err(RelayError::InvalidInput(format!(
                "Image {index} is not valid base64"
            )));
        }
    }

    let message = if message.is_empty() {
        DEFAULT_IMAGE_PROMPT.to_string()
    } else {
        message.to_string()
    };

    Ok(CompletionRequest {
        history: request.history,
        message,
        attachments: request.images,
    })
}
