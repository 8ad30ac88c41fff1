//! Business logic and port definitions for SquidAI.
//!
//! This crate defines the "ports" (provider, repository and transport traits)
//! that the infrastructure layer implements, plus the logic that sits between
//! them: the rate-limited chat relay, the session store adapter, and the
//! client-side chat controller. It depends only on `squidai-types` -- never on
//! `squidai-infra` or any database/HTTP crate.

pub mod chat;
pub mod client;
pub mod llm;
pub mod relay;
pub mod telemetry;
