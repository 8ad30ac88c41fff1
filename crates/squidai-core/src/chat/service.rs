//! Session store adapter routing each call to the durable or local backend.
//!
//! SessionService hides which backend holds a caller's sessions. Signed-in
//! callers go to the durable document store when one is configured; guests,
//! and everyone when no durable store is available, go to the local
//! fallback keyed by owner. Every listing is returned most-recent first.

use squidai_types::chat::{ConversationTurn, Session, sort_by_recency};
use squidai_types::error::RepositoryError;
use tracing::{debug, info};

use crate::chat::repository::SessionRepository;

/// Owner key for callers without a user id.
pub const GUEST_OWNER: &str = "guest";

/// Which backend served a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Durable,
    Local,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Durable => "durable",
            StoreBackend::Local => "local",
        }
    }
}

/// Dispatch a repository call to the backend chosen for `$user`.
macro_rules! route {
    ($self:ident, $user:expr, |$repo:ident, $owner:ident| $call:expr) => {
        match ($user, $self.durable.as_ref()) {
            (Some($owner), Some($repo)) => $call.await,
            (user, _) => {
                let $owner = user.unwrap_or(GUEST_OWNER);
                let $repo = &$self.local;
                $call.await
            }
        }
    };
}

/// Session persistence facade.
///
/// Generic over both backends so squidai-core never depends on a database
/// crate. `durable` is `None` when no connection string is configured or the
/// connection could not be established at startup.
pub struct SessionService<L: SessionRepository, D: SessionRepository> {
    local: L,
    durable: Option<D>,
}

impl<L: SessionRepository, D: SessionRepository> SessionService<L, D> {
    pub fn new(local: L, durable: Option<D>) -> Self {
        Self { local, durable }
    }

    /// Whether a durable store is attached.
    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// The backend a caller with `user_id` is served by.
    pub fn backend_for(&self, user_id: Option<&str>) -> StoreBackend {
        match (user_id, &self.durable) {
            (Some(_), Some(_)) => StoreBackend::Durable,
            _ => StoreBackend::Local,
        }
    }

    /// List the caller's sessions, most recent first.
    pub async fn list_sessions(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<Session>, RepositoryError> {
        let mut sessions = route!(self, user_id, |repo, owner| repo.list_sessions(owner))?;
        sort_by_recency(&mut sessions);
        debug!(
            backend = self.backend_for(user_id).as_str(),
            count = sessions.len(),
            "Listed sessions"
        );
        Ok(sessions)
    }

    pub async fn get_session(
        &self,
        user_id: Option<&str>,
        session_id: &str,
    ) -> Result<Option<Session>, RepositoryError> {
        route!(self, user_id, |repo, owner| repo.get_session(owner, session_id))
    }

    /// Create and store a new session titled after its first message.
    pub async fn create_session(
        &self,
        user_id: Option<&str>,
        first_message: &str,
    ) -> Result<Session, RepositoryError> {
        let session = Session::from_first_message(first_message);
        self.upsert_session(user_id, &session).await?;
        info!(session_id = %session.id, title = %session.title, "Session created");
        Ok(session)
    }

    /// Create or update a session (covers both `create` and `update` actions).
    pub async fn upsert_session(
        &self,
        user_id: Option<&str>,
        session: &Session,
    ) -> Result<(), RepositoryError> {
        route!(self, user_id, |repo, owner| repo.upsert_session(owner, session))
    }

    /// Append one turn. Fails with `NotFound` if the session does not exist.
    pub async fn append_message(
        &self,
        user_id: Option<&str>,
        session_id: &str,
        turn: &ConversationTurn,
    ) -> Result<(), RepositoryError> {
        route!(self, user_id, |repo, owner| repo.append_message(owner, session_id, turn))?;
        debug!(session_id, role = %turn.role, "Turn appended");
        Ok(())
    }

    pub async fn rename_session(
        &self,
        user_id: Option<&str>,
        session_id: &str,
        title: &str,
    ) -> Result<(), RepositoryError> {
        route!(self, user_id, |repo, owner| repo.rename_session(owner, session_id, title))?;
        info!(session_id, title, "Session renamed");
        Ok(())
    }

    pub async fn delete_session(
        &self,
        user_id: Option<&str>,
        session_id: &str,
    ) -> Result<(), RepositoryError> {
        route!(self, user_id, |repo, owner| repo.delete_session(owner, session_id))?;
        info!(session_id, "Session deleted");
        Ok(())
    }

    pub async fn clear_all(&self, user_id: Option<&str>) -> Result<(), RepositoryError> {
        route!(self, user_id, |repo, owner| repo.clear_all(owner))?;
        info!(backend = self.backend_for(user_id).as_str(), "All sessions cleared");
        Ok(())
    }

    /// Bulk upload. Afterwards every given session is listed for the caller.
    pub async fn sync(
        &self,
        user_id: Option<&str>,
        sessions: &[Session],
    ) -> Result<(), RepositoryError> {
        route!(self, user_id, |repo, owner| repo.replace_all(owner, sessions))?;
        info!(count = sessions.len(), "Sessions synced");
        Ok(())
    }
}
