//! HTTP handlers grouped by resource.

pub mod chat;
pub mod image;
pub mod session;
pub mod status;
pub mod telemetry;
