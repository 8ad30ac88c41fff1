//! Conversation turn and session types for SquidAI.
//!
//! These types model a chat conversation as it is persisted and replayed:
//! immutable turns appended to a session, plus the wire shapes the relay
//! accepts (history entries and inline attachments).

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Maximum length (in characters) of a title derived from a message.
const TITLE_MAX_CHARS: usize = 40;

/// Title used when no usable text is available.
pub const DEFAULT_SESSION_TITLE: &str = "New Session";

/// Author of a conversation turn.
///
/// A closed two-valued tag: the relay never emits a third role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    // Browser clients label replies "assistant"; the store only knows "model".
    #[serde(alias = "assistant")]
    Model,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Model => write!(f, "model"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "model" | "assistant" => Ok(TurnRole::Model),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// One message within a session. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
    /// ISO-8601 creation time, supplied by the caller.
    pub timestamp: String,
}

impl ConversationTurn {
    /// Create a turn stamped with the current time.
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Shorthand for a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text)
    }

    /// Shorthand for a model turn.
    pub fn model(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Model, text)
    }

    /// Convert to the history shape sent to the relay.
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            parts: self.text.clone(),
        }
    }
}

/// An ordered, named conversation owned by a user or a guest browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque id assigned at creation, never reused.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ConversationTurn>,
    /// Epoch milliseconds of the last append or metadata change.
    pub updated_at: i64,
}

impl Session {
    /// Create an empty session with a fresh id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            title: title.into(),
            messages: Vec::new(),
            updated_at: now_millis(),
        }
    }

    /// Create a session titled after the message that started it.
    pub fn from_first_message(message: &str) -> Self {
        Self::new(derive_title(message))
    }

    /// Append a turn and refresh `updated_at`.
    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.messages.push(turn);
        self.touch();
    }

    /// Change the title and refresh `updated_at`.
    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    /// Refresh `updated_at`. Never moves backwards.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(now_millis());
    }
}

/// Sort sessions by `updated_at`, most recent first.
pub fn sort_by_recency(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// Derive a session title from a message.
///
/// Whitespace is collapsed and the result truncated to 40 characters with
/// an ellipsis. Empty input yields [`DEFAULT_SESSION_TITLE`].
pub fn derive_title(message: &str) -> String {
    let collapsed = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return DEFAULT_SESSION_TITLE.to_string();
    }
    if collapsed.chars().count() <= TITLE_MAX_CHARS {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}...", truncated.trim_end())
}

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A prior turn as sent to the relay: `{ role, parts }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: TurnRole,
    pub parts: String,
}

/// Inline attachment carried by a single relay request. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedInput {
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// Body of a relay call: `{ history, message, images? }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<AttachedInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_request_optional_fields() {
        let req: RelayRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert!(req.history.is_empty());
        assert!(req.images.is_empty());

        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("images").is_none());
    }

    #[test]
    fn test_turn_role_serde() {
        let json = serde_json::to_string(&TurnRole::Model).unwrap();
        assert_eq!(json, "\"model\"");
        let parsed: TurnRole = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(parsed, TurnRole::User);
    }

    #[test]
    fn test_turn_role_accepts_assistant_alias() {
        assert_eq!("assistant".parse::<TurnRole>().unwrap(), TurnRole::Model);
        assert!("system".parse::<TurnRole>().is_err());
        let parsed: TurnRole = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(parsed, TurnRole::Model);
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let mut session = Session::new("Test");
        session.push_turn(ConversationTurn::user("hi"));
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("updatedAt").is_some());
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["text"], "hi");
    }

    #[test]
    fn test_session_without_messages_deserializes() {
        let session: Session =
            serde_json::from_str(r#"{"id":"s1","title":"t","updatedAt":5}"#).unwrap();
        assert!(session.messages.is_empty());
        assert_eq!(session.updated_at, 5);
    }

    #[test]
    fn test_push_turn_refreshes_updated_at() {
        let mut session = Session::new("t");
        session.updated_at = 1;
        session.push_turn(ConversationTurn::model("ok"));
        assert!(session.updated_at > 1);
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn test_sort_by_recency() {
        let mut sessions: Vec<Session> = [100, 300, 200]
            .into_iter()
            .map(|t| {
                let mut s = Session::new(format!("s{t}"));
                s.updated_at = t;
                s
            })
            .collect();
        sort_by_recency(&mut sessions);
        let order: Vec<i64> = sessions.iter().map(|s| s.updated_at).collect();
        assert_eq!(order, vec![300, 200, 100]);
    }

    #[test]
    fn test_derive_title() {
        assert_eq!(derive_title("  hello   world "), "hello world");
        assert_eq!(derive_title("   "), DEFAULT_SESSION_TITLE);

        let long = "a".repeat(60);
        let title = derive_title(&long);
        assert_eq!(title, format!("{}...", "a".repeat(40)));
    }

    #[test]
    fn test_derive_title_respects_char_boundaries() {
        let title = derive_title(&"é".repeat(50));
        assert_eq!(title.chars().count(), 43);
    }

    #[test]
    fn test_attached_input_wire_shape() {
        let input: AttachedInput =
            serde_json::from_str(r#"{"mimeType":"image/png","data":"AAAA"}"#).unwrap();
        assert_eq!(input.mime_type, "image/png");
    }

    #[test]
    fn test_turn_to_history_entry() {
        let entry = ConversationTurn::model("answer").to_history_entry();
        assert_eq!(entry.role, TurnRole::Model);
        assert_eq!(entry.parts, "answer");
    }
}
