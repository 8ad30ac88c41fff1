use thiserror::Error;

use crate::llm::LlmError;

/// Errors from the chat relay, before or while invoking the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Client-correctable request problem.
    #[error("{0}")]
    InvalidInput(String),

    /// Operator-correctable: the upstream credential is not configured.
    #[error("{0}")]
    ConfigurationMissing(String),

    /// The process-wide cooldown window has not elapsed.
    #[error("Cooldown: wait {:.1}s", millis_to_secs(.remaining_ms))]
    CoolingDown { remaining_ms: u64 },

    #[error(transparent)]
    Upstream(#[from] LlmError),
}

fn millis_to_secs(ms: &u64) -> f64 {
    *ms as f64 / 1000.0
}

/// Errors from repository operations (used by trait definitions in squidai-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooling_down_message() {
        let err = RelayError::CoolingDown { remaining_ms: 3200 };
        assert_eq!(err.to_string(), "Cooldown: wait 3.2s");
    }

    #[test]
    fn test_upstream_is_transparent() {
        let err: RelayError = LlmError::Stream("boom".to_string()).into();
        assert_eq!(err.to_string(), "stream error: boom");
    }
}
