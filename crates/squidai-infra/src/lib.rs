//! Infrastructure implementations for SquidAI.
//!
//! Adapters for the ports defined in `squidai-core`: the Gemini completion
//! provider, the local and MongoDB session stores, the MongoDB telemetry
//! sink, and the HTTP client used by the terminal chat. Also loads
//! configuration and secrets.

pub mod client;
pub mod config;
pub mod gemini;
pub mod mongo;
pub mod store;
