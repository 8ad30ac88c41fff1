//! HTTP API layer for SquidAI.
//!
//! Axum routes under `/api/`: the streaming chat relay, image generation,
//! session CRUD, fire-and-forget telemetry, and the document-store status
//! probe. Caller identity comes from headers set by the fronting identity
//! provider.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
