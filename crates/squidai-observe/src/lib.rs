//! Observability setup for SquidAI: structured logging and optional
//! OpenTelemetry span export.

pub mod tracing_setup;
