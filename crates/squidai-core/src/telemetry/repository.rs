//! Telemetry repository trait definition.
//!
//! Records written here are never read back by the chat flow. Callers
//! treat every write as best-effort.

use std::future::Future;

use squidai_types::error::RepositoryError;
use squidai_types::telemetry::{ChatMessageRecord, SearchRecord, UserProfile};

pub trait TelemetryRepository: Send + Sync {
    fn record_search(
        &self,
        record: &SearchRecord,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn record_chat_message(
        &self,
        record: &ChatMessageRecord,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Insert or refresh a user profile, keyed by email.
    fn upsert_user(
        &self,
        profile: &UserProfile,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
