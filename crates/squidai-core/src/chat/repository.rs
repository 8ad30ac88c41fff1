//! Session repository trait definition.
//!
//! Every operation is scoped to an owner key (a signed-in user id, or a
//! fixed key for guests). Uses RPITIT (native async fn in traits, Rust
//! 2024 edition). Implementations live in squidai-infra.

use std::future::Future;

use squidai_types::chat::{ConversationTurn, Session};
use squidai_types::error::RepositoryError;

/// Repository trait for session persistence.
pub trait SessionRepository: Send + Sync {
    /// All sessions of an owner, in no particular order.
    fn list_sessions(
        &self,
        owner: &str,
    ) -> impl Future<Output = Result<Vec<Session>, RepositoryError>> + Send;

    fn get_session(
        &self,
        owner: &str,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// Insert the session, or replace the stored one with the same id.
    fn upsert_session(
        &self,
        owner: &str,
        session: &Session,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Append a turn to the end of a session and refresh its `updated_at`.
    ///
    /// Returns `RepositoryError::NotFound` if the session does not exist.
    fn append_message(
        &self,
        owner: &str,
        session_id: &str,
        turn: &ConversationTurn,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Returns `RepositoryError::NotFound` if the session does not exist.
    fn rename_session(
        &self,
        owner: &str,
        session_id: &str,
        title: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a session. Deleting a missing session is not an error.
    fn delete_session(
        &self,
        owner: &str,
        session_id: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn clear_all(&self, owner: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Bulk sync. Afterwards every given session is stored under the owner.
    fn replace_all(
        &self,
        owner: &str,
        sessions: &[Session],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
