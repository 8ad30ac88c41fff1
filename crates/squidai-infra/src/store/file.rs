//! JSON-file session store.
//!
//! The single-device fallback: one file holding every owner's sessions,
//! `{ "<owner>": [Session, ...] }`. Each mutation is a read-modify-write of
//! the whole file. A process-local lock serializes those cycles and the
//! file is replaced atomically (write to a sibling, then rename), so a
//! crash never leaves a half-written file behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use squidai_core::chat::repository::SessionRepository;
use squidai_types::chat::{ConversationTurn, Session};
use squidai_types::error::RepositoryError;

type SessionFile = BTreeMap<String, Vec<Session>>;

pub struct FileSessionRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<SessionFile, RepositoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionFile::new()),
            Err(e) => {
                return Err(RepositoryError::Query(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        if content.trim().is_empty() {
            return Ok(SessionFile::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Session file is corrupt");
            RepositoryError::Serialization(format!("failed to parse {}: {e}", self.path.display()))
        })
    }

    async fn save(&self, data: &SessionFile) -> Result<(), RepositoryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepositoryError::Query(format!("failed to create {}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| RepositoryError::Query(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| RepositoryError::Query(format!("failed to replace {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), owners = data.len(), "Session file saved");
        Ok(())
    }

    /// Run one read-modify-write cycle under the lock.
    async fn modify<R>(
        &self,
        f: impl FnOnce(&mut SessionFile) -> Result<R, RepositoryError>,
    ) -> Result<R, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let result = f(&mut data)?;
        self.save(&data).await?;
        Ok(result)
    }
}

fn find_mut<'a>(
    data: &'a mut SessionFile,
    owner: &str,
    session_id: &str,
) -> Result<&'a mut Session, RepositoryError> {
    data.get_mut(owner)
        .and_then(|list| list.iter_mut().find(|s| s.id == session_id))
        .ok_or(RepositoryError::NotFound)
}

impl SessionRepository for FileSessionRepository {
    async fn list_sessions(&self, owner: &str) -> Result<Vec<Session>, RepositoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(owner).unwrap_or_default())
    }

    async fn get_session(
        &self,
        owner: &str,
        session_id: &str,
    ) -> Result<Option<Session>, RepositoryError> {
        let sessions = self.list_sessions(owner).await?;
        Ok(sessions.into_iter().find(|s| s.id == session_id))
    }

    async fn upsert_session(&self, owner: &str, session: &Session) -> Result<(), RepositoryError> {
        self.modify(|data| {
            let list = data.entry(owner.to_string()).or_default();
            match list.iter_mut().find(|s| s.id == session.id) {
                Some(existing) => *existing = session.clone(),
                None => list.push(session.clone()),
            }
            Ok(())
        })
        .await
    }

    async fn append_message(
        &self,
        owner: &str,
        session_id: &str,
        turn: &ConversationTurn,
    ) -> Result<(), RepositoryError> {
        self.modify(|data| {
            find_mut(data, owner, session_id)?.push_turn(turn.clone());
            Ok(())
        })
        .await
    }

    async fn rename_session(
        &self,
        owner: &str,
        session_id: &str,
        title: &str,
    ) -> Result<(), RepositoryError> {
        self.modify(|data| {
            find_mut(data, owner, session_id)?.rename(title);
            Ok(())
        })
        .await
    }

    async fn delete_session(&self, owner: &str, session_id: &str) -> Result<(), RepositoryError> {
        self.modify(|data| {
            if let Some(list) = data.get_mut(owner) {
                list.retain(|s| s.id != session_id);
            }
            Ok(())
        })
        .await
    }

    async fn clear_all(&self, owner: &str) -> Result<(), RepositoryError> {
        self.modify(|data| {
            data.remove(owner);
            Ok(())
        })
        .await
    }

    async fn replace_all(&self, owner: &str, sessions: &[Session]) -> Result<(), RepositoryError> {
        self.modify(|data| {
            data.insert(owner.to_string(), sessions.to_vec());
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo_in(dir: &TempDir) -> FileSessionRepository {
        FileSessionRepository::new(dir.path().join("sessions.json"))
    }

    #[tokio::test]
    async fn test_missing_file_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let repo = repo_in(&tmp);
        assert!(repo.list_sessions("guest").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let session = Session::new("persisted");
        {
            let repo = repo_in(&tmp);
            repo.upsert_session("guest", &session).await.unwrap();
            repo.append_message("guest", &session.id, &ConversationTurn::user("hello"))
                .await
                .unwrap();
        }

        let reopened = repo_in(&tmp);
        let stored = reopened.get_session("guest", &session.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "persisted");
        assert_eq!(stored.messages[0].text, "hello");
        assert!(!tmp.path().join("sessions.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rename_missing_session_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let repo = repo_in(&tmp);
        let err = repo.rename_session("guest", "nope", "t").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_kept() {
        let tmp = TempDir::new().unwrap();
        let repo = std::sync::Arc::new(repo_in(&tmp));
        let session = Session::new("busy");
        repo.upsert_session("guest", &session).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let repo = repo.clone();
            let id = session.id.clone();
            handles.push(tokio::spawn(async move {
                repo.append_message("guest", &id, &ConversationTurn::user(format!("m{i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = repo.get_session("guest", &session.id).await.unwrap().unwrap();
        assert_eq!(stored.messages.len(), 10);
    }

    #[tokio::test]
    async fn test_replace_all_and_clear() {
        let tmp = TempDir::new().unwrap();
        let repo = repo_in(&tmp);
        repo.upsert_session("guest", &Session::new("old")).await.unwrap();

        let incoming = vec![Session::new("a"), Session::new("b")];
        repo.replace_all("guest", &incoming).await.unwrap();
        let titles: Vec<String> = repo
            .list_sessions("guest")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["a", "b"]);

        repo.clear_all("guest").await.unwrap();
        assert!(repo.list_sessions("guest").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("sessions.json"), "{ not json").await.unwrap();
        let repo = repo_in(&tmp);
        assert!(matches!(
            repo.list_sessions("guest").await,
            Err(RepositoryError::Serialization(_))
        ));
    }
}
