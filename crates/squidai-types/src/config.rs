//! Configuration types for SquidAI.
//!
//! `AppConfig` represents the optional `squidai.toml` that tunes the relay,
//! the upstream client and the session store. Secrets never live here; they
//! are read from the environment by the infra layer.

use serde::{Deserialize, Serialize};

/// Top-level configuration. All fields have defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL the site is served from (used in logs and client defaults).
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

/// Chat relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Minimum interval between accepted relay requests, process-wide.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

fn default_cooldown_ms() -> u64 {
    5_000
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

/// Upstream generative-AI client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    /// Number of most recent history turns forwarded upstream.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_text_timeout_secs")]
    pub text_timeout_secs: u64,
    #[serde(default = "default_image_timeout_secs")]
    pub image_timeout_secs: u64,
    /// Longest provider-suggested delay the image path will wait before its retry.
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_image_model() -> String {
    "gemini-2.0-flash-exp-image-generation".to_string()
}

fn default_history_limit() -> usize {
    4
}

fn default_text_timeout_secs() -> u64 {
    60
}

fn default_image_timeout_secs() -> u64 {
    90
}

fn default_max_retry_delay_ms() -> u64 {
    120_000
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            image_model: default_image_model(),
            history_limit: default_history_limit(),
            text_timeout_secs: default_text_timeout_secs(),
            image_timeout_secs: default_image_timeout_secs(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

/// Which local fallback backs the session store when no document store is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalStoreKind {
    #[default]
    File,
    Memory,
}

/// Session store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_database_name")]
    pub database_name: String,
    #[serde(default)]
    pub local: LocalStoreKind,
    /// File name (relative to the data directory) of the local session file.
    #[serde(default = "default_local_file")]
    pub local_file: String,
}

fn default_database_name() -> String {
    "SquidAI".to_string()
}

fn default_local_file() -> String {
    "sessions.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_name: default_database_name(),
            local: LocalStoreKind::default(),
            local_file: default_local_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.relay.cooldown_ms, 5_000);
        assert_eq!(config.upstream.history_limit, 4);
        assert_eq!(config.upstream.text_timeout_secs, 60);
        assert_eq!(config.upstream.image_timeout_secs, 90);
        assert_eq!(config.store.database_name, "SquidAI");
        assert_eq!(config.store.local, LocalStoreKind::File);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
[relay]
cooldown_ms = 1000

[store]
local = "memory"
"#,
        )
        .unwrap();
        assert_eq!(config.relay.cooldown_ms, 1000);
        assert_eq!(config.store.local, LocalStoreKind::Memory);
        assert_eq!(config.upstream.model, "gemini-2.0-flash");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.store.local_file, "sessions.json");
    }
}
