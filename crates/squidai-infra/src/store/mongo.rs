//! MongoDB session store for signed-in users.
//!
//! One document per session in the `sessions` collection, tagged with the
//! owner's `userId`. Appends use `$push` so concurrent appends to the same
//! session are applied atomically by the server; `updatedAt` is bumped with
//! `$max` so it never moves backwards.

use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc, to_bson, to_document};
use mongodb::{Collection, Database, IndexModel};
use tracing::{debug, warn};

use squidai_core::chat::repository::SessionRepository;
use squidai_types::chat::{ConversationTurn, Session, now_millis};
use squidai_types::error::RepositoryError;

const SESSIONS: &str = "sessions";

pub struct MongoSessionRepository {
    database: Database,
}

impl MongoSessionRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Create the `(userId, id)` lookup index. Failure is logged, not fatal.
    pub async fn ensure_indexes(&self) {
        let index = IndexModel::builder()
            .keys(doc! { "userId": 1, "id": 1 })
            .build();
        if let Err(e) = self.documents().create_index(index).await {
            warn!(error = %e, "Failed to create sessions index");
        }
    }

    fn sessions(&self) -> Collection<Session> {
        self.database.collection(SESSIONS)
    }

    fn documents(&self) -> Collection<Document> {
        self.database.collection(SESSIONS)
    }
}

fn query_error(e: mongodb::error::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

fn session_filter(owner: &str, session_id: &str) -> Document {
    doc! { "userId": owner, "id": session_id }
}

/// The stored form of a session: the session fields plus its owner.
pub fn session_document(owner: &str, session: &Session) -> Result<Document, RepositoryError> {
    let mut document =
        to_document(session).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    document.insert("userId", owner);
    Ok(document)
}

impl SessionRepository for MongoSessionRepository {
    async fn list_sessions(&self, owner: &str) -> Result<Vec<Session>, RepositoryError> {
        let cursor = self
            .sessions()
            .find(doc! { "userId": owner })
            .await
            .map_err(query_error)?;
        cursor.try_collect().await.map_err(query_error)
    }

    async fn get_session(
        &self,
        owner: &str,
        session_id: &str,
    ) -> Result<Option<Session>, RepositoryError> {
        self.sessions()
            .find_one(session_filter(owner, session_id))
            .await
            .map_err(query_error)
    }

    async fn upsert_session(&self, owner: &str, session: &Session) -> Result<(), RepositoryError> {
        let document = session_document(owner, session)?;
        self.documents()
            .replace_one(session_filter(owner, &session.id), document)
            .upsert(true)
            .await
            .map_err(query_error)?;
        debug!(session_id = %session.id, "Session upserted");
        Ok(())
    }

    async fn append_message(
        &self,
        owner: &str,
        session_id: &str,
        turn: &ConversationTurn,
    ) -> Result<(), RepositoryError> {
        let turn = to_bson(turn).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let result = self
            .documents()
            .update_one(
                session_filter(owner, session_id),
                doc! {
                    "$push": { "messages": turn },
                    "$max": { "updatedAt": now_millis() },
                },
            )
            .await
            .map_err(query_error)?;
        if result.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn rename_session(
        &self,
        owner: &str,
        session_id: &str,
        title: &str,
    ) -> Result<(), RepositoryError> {
        let result = self
            .documents()
            .update_one(
                session_filter(owner, session_id),
                doc! {
                    "$set": { "title": title },
                    "$max": { "updatedAt": now_millis() },
                },
            )
            .await
            .map_err(query_error)?;
        if result.matched_count == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_session(&self, owner: &str, session_id: &str) -> Result<(), RepositoryError> {
        self.documents()
            .delete_one(session_filter(owner, session_id))
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn clear_all(&self, owner: &str) -> Result<(), RepositoryError> {
        let result = self
            .documents()
            .delete_many(doc! { "userId": owner })
            .await
            .map_err(query_error)?;
        debug!(deleted = result.deleted_count, "Sessions cleared");
        Ok(())
    }

    /// Upserts each incoming session; sessions not in the list are kept.
    async fn replace_all(&self, owner: &str, sessions: &[Session]) -> Result<(), RepositoryError> {
        for session in sessions {
            self.upsert_session(owner, session).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_document_carries_owner_and_fields() {
        let mut session = Session::new("Mongo");
        session.push_turn(ConversationTurn::user("hi"));
        let document = session_document("u1", &session).unwrap();

        assert_eq!(document.get_str("userId").unwrap(), "u1");
        assert_eq!(document.get_str("id").unwrap(), session.id);
        assert_eq!(document.get_str("title").unwrap(), "Mongo");
        assert!(document.get_i64("updatedAt").is_ok());
        assert_eq!(document.get_array("messages").unwrap().len(), 1);
    }

    #[test]
    fn test_session_filter() {
        let filter = session_filter("u1", "s1");
        assert_eq!(filter.get_str("userId").unwrap(), "u1");
        assert_eq!(filter.get_str("id").unwrap(), "s1");
    }
}
