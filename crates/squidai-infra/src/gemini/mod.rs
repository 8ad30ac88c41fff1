//! Google Gemini completion provider.
//!
//! [`GeminiProvider`] implements
//! [`CompletionProvider`](squidai_core::llm::provider::CompletionProvider)
//! for the Generative Language API: streamed text via
//! `streamGenerateContent` and image generation via `generateContent`.

pub mod client;
pub mod error;
pub mod streaming;
pub mod types;

pub use client::GeminiProvider;
