//! MongoDB analytics sink.
//!
//! Writes searches, chat messages and user profiles to their own
//! collections, each stamped with a server-side `createdAt`.

use mongodb::bson::{DateTime, Document, doc, to_document};
use mongodb::{Collection, Database};
use serde::Serialize;

use squidai_core::telemetry::repository::TelemetryRepository;
use squidai_types::error::RepositoryError;
use squidai_types::telemetry::{ChatMessageRecord, SearchRecord, UserProfile};

const SEARCHES: &str = "user_searches";
const CHAT_MESSAGES: &str = "chat_messages";
const USERS: &str = "users";

pub struct MongoTelemetryRepository {
    database: Database,
}

impl MongoTelemetryRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    async fn insert_stamped<T: Serialize>(&self, name: &str, record: &T) -> Result<(), RepositoryError> {
        let document = stamped(record)?;
        self.collection(name)
            .insert_one(document)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}

/// Serialize a record and add `createdAt`.
pub fn stamped<T: Serialize>(record: &T) -> Result<Document, RepositoryError> {
    let mut document =
        to_document(record).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    document.insert("createdAt", DateTime::now());
    Ok(document)
}

/// Update document for a login: refresh the profile, set `createdAt` once.
pub fn user_upsert(profile: &UserProfile) -> Document {
    let now = DateTime::now();
    let mut set = doc! {
        "id": &profile.id,
        "email": &profile.email,
        "lastLoginAt": now,
    };
    if let Some(name) = &profile.name {
        set.insert("name", name);
    }
    doc! {
        "$set": set,
        "$setOnInsert": { "createdAt": now },
    }
}

impl TelemetryRepository for MongoTelemetryRepository {
    async fn record_search(&self, record: &SearchRecord) -> Result<(), RepositoryError> {
        self.insert_stamped(SEARCHES, record).await
    }

    async fn record_chat_message(&self, record: &ChatMessageRecord) -> Result<(), RepositoryError> {
        self.insert_stamped(CHAT_MESSAGES, record).await
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        self.collection(USERS)
            .update_one(doc! { "email": &profile.email }, user_upsert(profile))
            .upsert(true)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}
