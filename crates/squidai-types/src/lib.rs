//! Shared domain types for SquidAI.
//!
//! This crate contains the types that flow between the chat relay, the
//! session store and the client controller: conversation turns, sessions,
//! relay requests, telemetry records, configuration and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod telemetry;
