//! Session and telemetry writes over the SquidAI HTTP API.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use squidai_core::client::transport::ChatPersistence;
use squidai_types::chat::{ConversationTurn, Session};
use squidai_types::error::RepositoryError;
use squidai_types::telemetry::{ChatMessageRecord, SearchRecord};

use super::ApiClient;

pub struct HttpChatPersistence {
    api: ApiClient,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    #[serde(default)]
    sessions: Vec<Session>,
}

impl HttpChatPersistence {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// The caller's sessions, most recent first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, RepositoryError> {
        let response = self
            .api
            .request(Method::GET, "/api/sessions")
            .send()
            .await
            .map_err(|e| RepositoryError::Connection(e.without_url().to_string()))?;
        let response = ensure_success(response).await?;
        let list: SessionList = response
            .json()
            .await
            .map_err(|e| RepositoryError::Serialization(e.without_url().to_string()))?;
        Ok(list.sessions)
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<(), RepositoryError> {
        let response = self
            .api
            .request(Method::POST, path)
            .json(&body)
            .send()
            .await
            .map_err(|e| RepositoryError::Connection(e.without_url().to_string()))?;
        ensure_success(response).await?;
        Ok(())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RepositoryError::NotFound);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RepositoryError::Query(format!("{}: {body}", status.as_u16())))
}

impl ChatPersistence for HttpChatPersistence {
    async fn create_session(&self, session: &Session) -> Result<(), RepositoryError> {
        self.post("/api/sessions", json!({ "action": "create", "session": session }))
            .await
    }

    async fn append_turn(
        &self,
        session_id: &str,
        turn: &ConversationTurn,
    ) -> Result<(), RepositoryError> {
        self.post(
            "/api/sessions",
            json!({ "action": "addMessage", "sessionId": session_id, "message": turn }),
        )
        .await
    }

    async fn record_search(&self, record: &SearchRecord) -> Result<(), RepositoryError> {
        let body = serde_json::to_value(record)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        self.post("/api/save-search", body).await
    }

    async fn record_message(&self, record: &ChatMessageRecord) -> Result<(), RepositoryError> {
        let body = serde_json::to_value(record)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        self.post("/api/save-chat-message", body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squidai_core::client::controller::ClientIdentity;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn signed_in(uri: String) -> HttpChatPersistence {
        HttpChatPersistence::new(ApiClient::new(
            uri,
            ClientIdentity {
                user_id: Some("u1".to_string()),
                email: Some("a@b.c".to_string()),
            },
        ))
    }

    #[tokio::test]
    async fn create_session_posts_create_action_with_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions"))
            .and(header("x-user-id", "u1"))
            .and(header("x-user-email", "a@b.c"))
            .and(body_partial_json(json!({ "action": "create" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::new("hello");
        signed_in(server.uri()).create_session(&session).await.unwrap();
    }

    #[tokio::test]
    async fn append_turn_missing_session_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sessions"))
            .and(body_partial_json(json!({ "action": "addMessage", "sessionId": "gone" })))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "error": "Session not found" })),
            )
            .mount(&server)
            .await;

        let err = signed_in(server.uri())
            .append_turn("gone", &ConversationTurn::user("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn list_sessions_reads_sessions_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sessions": [{ "id": "s1", "title": "t", "messages": [], "updatedAt": 10 }]
            })))
            .mount(&server)
            .await;

        let sessions = signed_in(server.uri()).list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "s1");
    }

    #[tokio::test]
    async fn record_search_posts_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/save-search"))
            .and(body_partial_json(json!({ "query": "rust lifetimes" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let record = SearchRecord {
            query: "rust lifetimes".to_string(),
            user_id: None,
            user_email: None,
            session_id: None,
        };
        signed_in(server.uri()).record_search(&record).await.unwrap();
    }
}
