//! In-process session store.
//!
//! Used when the local fallback is configured as `memory` (and by tests).
//! Contents are lost on restart. Each owner's list lives under one DashMap
//! entry, so mutations of one owner's sessions are serialized by the shard lock.

use dashmap::DashMap;

use squidai_core::chat::repository::SessionRepository;
use squidai_types::chat::{ConversationTurn, Session};
use squidai_types::error::RepositoryError;

#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: DashMap<String, Vec<Session>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_session<R>(
        &self,
        owner: &str,
        session_id: &str,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Result<R, RepositoryError> {
        let mut list = self.sessions.get_mut(owner).ok_or(RepositoryError::NotFound)?;
        let session = list
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(f(session))
    }
}

impl SessionRepository for InMemorySessionRepository {
    async fn list_sessions(&self, owner: &str) -> Result<Vec<Session>, RepositoryError> {
        Ok(self
            .sessions
            .get(owner)
            .map(|list| list.clone())
            .unwrap_or_default())
    }

    async fn get_session(
        &self,
        owner: &str,
        session_id: &str,
    ) -> Result<Option<Session>, RepositoryError> {
        Ok(self
            .sessions
            .get(owner)
            .and_then(|list| list.iter().find(|s| s.id == session_id).cloned()))
    }

    async fn upsert_session(&self, owner: &str, session: &Session) -> Result<(), RepositoryError> {
        let mut list = self.sessions.entry(owner.to_string()).or_default();
        match list.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => list.push(session.clone()),
        }
        Ok(())
    }

    async fn append_message(
        &self,
        owner: &str,
        session_id: &str,
        turn: &ConversationTurn,
    ) -> Result<(), RepositoryError> {
        self.with_session(owner, session_id, |s| s.push_turn(turn.clone()))
    }

    async fn rename_session(
        &self,
        owner: &str,
        session_id: &str,
        title: &str,
    ) -> Result<(), RepositoryError> {
        self.with_session(owner, session_id, |s| s.rename(title))
    }

    async fn delete_session(&self, owner: &str, session_id: &str) -> Result<(), RepositoryError> {
        if let Some(mut list) = self.sessions.get_mut(owner) {
            list.retain(|s| s.id != session_id);
        }
        Ok(())
    }

    async fn clear_all(&self, owner: &str) -> Result<(), RepositoryError> {
        self.sessions.remove(owner);
        Ok(())
    }

    async fn replace_all(&self, owner: &str, sessions: &[Session]) -> Result<(), RepositoryError> {
        self.sessions.insert(owner.to_string(), sessions.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let repo = InMemorySessionRepository::new();
        repo.upsert_session("guest", &Session::new("a")).await.unwrap();
        repo.upsert_session("u1", &Session::new("b")).await.unwrap();

        assert_eq!(repo.list_sessions("guest").await.unwrap().len(), 1);
        assert_eq!(repo.list_sessions("u1").await.unwrap()[0].title, "b");
        assert!(repo.list_sessions("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let repo = InMemorySessionRepository::new();
        let mut session = Session::new("first");
        repo.upsert_session("guest", &session).await.unwrap();
        session.rename("second");
        repo.upsert_session("guest", &session).await.unwrap();

        let listed = repo.list_sessions("guest").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "second");
    }

    #[tokio::test]
    async fn test_append_and_not_found() {
        let repo = InMemorySessionRepository::new();
        let session = Session::new("chat");
        repo.upsert_session("guest", &session).await.unwrap();

        repo.append_message("guest", &session.id, &ConversationTurn::user("q"))
            .await
            .unwrap();
        repo.append_message("guest", &session.id, &ConversationTurn::model("a"))
            .await
            .unwrap();
        let stored = repo.get_session("guest", &session.id).await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[1].text, "a");

        let err = repo
            .append_message("u1", &session.id, &ConversationTurn::user("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }
}
