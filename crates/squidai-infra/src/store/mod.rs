//! Session store backends and the MongoDB telemetry sink.

pub mod file;
pub mod memory;
pub mod mongo;
pub mod telemetry;

use squidai_core::chat::repository::SessionRepository;
use squidai_types::chat::{ConversationTurn, Session};
use squidai_types::error::RepositoryError;

pub use file::FileSessionRepository;
pub use memory::InMemorySessionRepository;
pub use mongo::MongoSessionRepository;
pub use telemetry::MongoTelemetryRepository;

/// The local fallback store selected by configuration.
pub enum LocalSessionRepository {
    File(FileSessionRepository),
    Memory(InMemorySessionRepository),
}

impl SessionRepository for LocalSessionRepository {
    async fn list_sessions(&self, owner: &str) -> Result<Vec<Session>, RepositoryError> {
        match self {
            Self::File(repo) => repo.list_sessions(owner).await,
            Self::Memory(repo) => repo.list_sessions(owner).await,
        }
    }

    async fn get_session(
        &self,
        owner: &str,
        session_id: &str,
    ) -> Result<Option<Session>, RepositoryError> {
        match self {
            Self::File(repo) => repo.get_session(owner, session_id).await,
            Self::Memory(repo) => repo.get_session(owner, session_id).await,
        }
    }

    async fn upsert_session(&self, owner: &str, session: &Session) -> Result<(), RepositoryError> {
        match self {
            Self::File(repo) => repo.upsert_session(owner, session).await,
            Self::Memory(repo) => repo.upsert_session(owner, session).await,
        }
    }

    async fn append_message(
        &self,
        owner: &str,
        session_id: &str,
        turn: &ConversationTurn,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::File(repo) => repo.append_message(owner, session_id, turn).await,
            Self::Memory(repo) => repo.append_message(owner, session_id, turn).await,
        }
    }

    async fn rename_session(
        &self,
        owner: &str,
        session_id: &str,
        title: &str,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::File(repo) => repo.rename_session(owner, session_id, title).await,
            Self::Memory(repo) => repo.rename_session(owner, session_id, title).await,
        }
    }

    async fn delete_session(&self, owner: &str, session_id: &str) -> Result<(), RepositoryError> {
        match self {
            Self::File(repo) => repo.delete_session(owner, session_id).await,
            Self::Memory(repo) => repo.delete_session(owner, session_id).await,
        }
    }

    async fn clear_all(&self, owner: &str) -> Result<(), RepositoryError> {
        match self {
            Self::File(repo) => repo.clear_all(owner).await,
            Self::Memory(repo) => repo.clear_all(owner).await,
        }
    }

    async fn replace_all(&self, owner: &str, sessions: &[Session]) -> Result<(), RepositoryError> {
        match self {
            Self::File(repo) => repo.replace_all(owner, sessions).await,
            Self::Memory(repo) => repo.replace_all(owner, sessions).await,
        }
    }
}
