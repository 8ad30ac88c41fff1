//! MongoDB connection and health check.
//!
//! The document store is optional: without `MONGODB_URI`, or when the
//! first ping fails, the server runs on the local session store.

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, warn};

use squidai_types::error::RepositoryError;

/// How long the driver waits to find a usable server.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect and ping. The returned handle is cheap to clone.
pub async fn connect(uri: &SecretString, database_name: &str) -> Result<Database, RepositoryError> {
    let mut options = ClientOptions::parse(uri.expose_secret())
        .await
        .map_err(|e| RepositoryError::Connection(e.to_string()))?;
    options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
    options.app_name = Some("squidai".to_string());

    let client =
        Client::with_options(options).map_err(|e| RepositoryError::Connection(e.to_string()))?;
    let database = client.database(database_name);
    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| RepositoryError::Connection(e.to_string()))?;

    info!(database = database_name, "Connected to MongoDB");
    Ok(database)
}

/// Connect if a URI is configured; log and fall back to `None` otherwise.
pub async fn connect_optional(uri: Option<&SecretString>, database_name: &str) -> Option<Database> {
    let uri = uri?;
    match connect(uri, database_name).await {
        Ok(database) => Some(database),
        Err(e) => {
            warn!(error = %e, "MongoDB unavailable, using local session store");
            None
        }
    }
}

/// Result of a document-store health check, shaped for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl StoreStatus {
    fn connected() -> Self {
        Self {
            ok: true,
            message: Some("Connected to MongoDB".to_string()),
            error: None,
            fix: None,
        }
    }

    fn failed(error: impl Into<String>, fix: &str) -> Self {
        Self {
            ok: false,
            message: None,
            error: Some(error.into()),
            fix: Some(fix.to_string()),
        }
    }
}

/// Try to connect and ping, reporting a remediation hint on failure.
pub async fn check_status(uri: Option<&SecretString>, database_name: &str) -> StoreStatus {
    let Some(uri) = uri else {
        return StoreStatus::failed(
            "MONGODB_URI not set",
            "Add MONGODB_URI to .env.local or the server environment. If the password has @, use %40.",
        );
    };
    match connect(uri, database_name).await {
        Ok(_) => StoreStatus::connected(),
        Err(e) => {
            let message = match e {
                RepositoryError::Connection(message) => message,
                other => other.to_string(),
            };
            let fix = remediation_for(&message);
            StoreStatus::failed(message, fix)
        }
    }
}

/// Operator-facing fix for a connection failure message.
pub fn remediation_for(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    if lower.contains("auth") {
        "Check username/password. If the password contains @ # or ?, URL-encode it: @ -> %40, # -> %23, ? -> %3F."
    } else if lower.contains("enotfound") || lower.contains("getaddrinfo") || lower.contains("dns") {
        "Check the cluster hostname (e.g. cluster0.xxxxx.mongodb.net) and your internet connection."
    } else if lower.contains("timed out") || lower.contains("timeout") {
        "Allow your IP in Atlas: Network Access -> Add IP Address (or 0.0.0.0/0 for development)."
    } else {
        "See the Atlas dashboard and the server logs."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remediation_by_failure_kind() {
        assert!(remediation_for("SCRAM failure: Authentication failed.").contains("password"));
        assert!(remediation_for("DNS error: failed to lookup address").contains("hostname"));
        assert!(remediation_for("Server selection timeout: No available servers").contains("Atlas"));
        assert!(remediation_for("something else").contains("logs"));
    }

    #[tokio::test]
    async fn test_status_without_uri() {
        let status = check_status(None, "SquidAI").await;
        assert!(!status.ok);
        assert_eq!(status.error.as_deref(), Some("MONGODB_URI not set"));

        let json = serde_json::to_value(&status).unwrap();
        assert!(json.get("message").is_none());
        assert!(json.get("fix").is_some());
    }

    #[tokio::test]
    async fn test_connect_optional_without_uri() {
        assert!(connect_optional(None, "SquidAI").await.is_none());
    }
}
