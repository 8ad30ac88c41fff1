//! CompletionProvider trait definition.
//!
//! The relay talks to the upstream generative-AI service only through this
//! trait. Uses RPITIT for the async methods and a boxed stream for the
//! reply so the relay can hand it straight to the HTTP response body.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tracing::Span;

use squidai_types::llm::{CompletionRequest, GeneratedImage, LlmError};

/// Plain-text reply fragments in arrival order, with no structural wrapper.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send + 'static>>;

/// Trait for upstream completion backends.
///
/// Implementations live in squidai-infra (e.g., `GeminiProvider`).
pub trait CompletionProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Model identifier used for text completions.
    fn model(&self) -> &str;

    /// Start a streaming completion.
    ///
    /// Resolves once the upstream has answered with a success status; HTTP
    /// and connection failures surface here, before any text is produced.
    /// Failures after that point arrive as `Err` items on the stream.
    fn stream(
        &self,
        request: CompletionRequest,
    ) -> impl Future<Output = Result<TextStream, LlmError>> + Send;

    /// Generate an image from a text prompt.
    fn generate_image(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<GeneratedImage, LlmError>> + Send;
}

/// A [`TextStream`] that is polled with `span` entered, so fragment-level
/// events are attributed to the upstream call that produced them.
pub struct StreamInSpan {
    inner: TextStream,
    span: Span,
}

impl StreamInSpan {
    pub fn new(inner: TextStream, span: Span) -> Self {
        Self { inner, span }
    }
}

impl Stream for StreamInSpan {
    type Item = Result<String, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Both fields are Unpin; the inner stream is already boxed.
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}
