//! Ports the chat controller talks through.
//!
//! `RelayTransport` reaches the relay endpoint; `ChatPersistence` reaches
//! the session store and the telemetry sink. squidai-infra provides HTTP
//! implementations of both.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use squidai_types::chat::{ConversationTurn, RelayRequest, Session};
use squidai_types::error::RepositoryError;
use squidai_types::telemetry::{ChatMessageRecord, SearchRecord};

/// Raw reply body in arrival order.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send + 'static>>;

/// Why a relay call did not produce a reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The relay answered with a non-success status.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        hint: Option<String>,
        /// Suggested wait before retrying, when the server knows one.
        retry_after_ms: Option<u64>,
    },

    #[error("network error: {0}")]
    Network(String),

    /// The stream ended without any text.
    #[error("empty response from server")]
    EmptyBody,

    #[error("stream interrupted: {0}")]
    Stream(String),
}

impl TransportError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportError::Rejected { status: 429, .. })
    }
}

/// Sends one relay request.
pub trait RelayTransport: Send + Sync {
    fn send(
        &self,
        request: RelayRequest,
    ) -> impl Future<Output = Result<ByteStream, TransportError>> + Send;
}

/// Session and analytics writes issued by the controller.
///
/// Every call is best-effort from the controller's point of view: errors
/// are logged and never shown to the user.
pub trait ChatPersistence: Send + Sync {
    fn create_session(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn append_turn(
        &self,
        session_id: &str,
        turn: &ConversationTurn,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn record_search(
        &self,
        _record: &SearchRecord,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async { Ok(()) }
    }

    fn record_message(
        &self,
        _record: &ChatMessageRecord,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async { Ok(()) }
    }
}
