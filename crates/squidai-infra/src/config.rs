//! Configuration loader for SquidAI.
//!
//! Reads `squidai.toml` from the data directory (`~/.squidai/` by default)
//! into [`AppConfig`], then lets environment variables override the few
//! settings deployments usually change. Secrets are read only from the
//! environment, optionally seeded from `.env.local` / `.env`.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use squidai_types::config::AppConfig;

/// Resolve the data directory.
///
/// Priority:
/// 1. `SQUIDAI_DATA_DIR` environment variable
/// 2. `~/.squidai`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SQUIDAI_DATA_DIR") {
        return PathBuf::from(dir);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".squidai");
    }
    PathBuf::from(".squidai")
}

/// What [`load_dotenv`] did. It runs before tracing is installed, so the
/// caller logs this once the subscriber is up.
#[derive(Debug, Default)]
pub struct DotenvReport {
    pub skipped: bool,
    pub loaded: Vec<PathBuf>,
    /// File name and the parse or read error.
    pub failed: Vec<(String, String)>,
}

impl DotenvReport {
    pub fn log(&self) {
        if self.skipped {
            tracing::debug!("SQUIDAI_ENV=production, .env files ignored");
        }
        for path in &self.loaded {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        for (file, err) in &self.failed {
            tracing::warn!("Failed to load {file}: {err}");
        }
    }
}

/// Seed the process environment from `.env.local` then `.env` in the
/// working directory.
///
/// Variables already set win over file values. Skipped entirely when
/// `SQUIDAI_ENV=production`.
pub fn load_dotenv() -> DotenvReport {
    if std::env::var("SQUIDAI_ENV").is_ok_and(|v| v == "production") {
        return DotenvReport {
            skipped: true,
            ..DotenvReport::default()
        };
    }
    load_dotenv_from(Path::new("."))
}

fn load_dotenv_from(dir: &Path) -> DotenvReport {
    let mut report = DotenvReport::default();
    for file in [".env.local", ".env"] {
        let path = dir.join(file);
        match dotenvy::from_path(&path) {
            Ok(()) => report.loaded.push(path),
            Err(err) if err.not_found() => {}
            Err(err) => report.failed.push((file.to_string(), err.to_string())),
        }
    }
    report
}

/// Load `{data_dir}/squidai.toml`.
///
/// - Missing file: defaults.
/// - Unreadable or malformed file: logs a warning and returns defaults.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("squidai.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No squidai.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            AppConfig::default()
        }
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut AppConfig) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides using `lookup` as the environment. Empty values are ignored.
pub fn apply_overrides_from(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(model) = get("GEMINI_MODEL") {
        config.upstream.model = model;
    }
    if let Some(model) = get("GEMINI_IMAGE_MODEL") {
        config.upstream.image_model = model;
    }
    if let Some(url) = get("GEMINI_BASE_URL") {
        config.upstream.base_url = url;
    }
    if let Some(name) = get("MONGODB_DB_NAME") {
        config.store.database_name = name;
    }
    if let Some(url) = get("PUBLIC_BASE_URL") {
        config.server.public_base_url = Some(url);
    }
    if let Some(port) = get("PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!("Ignoring invalid PORT value {port:?}"),
        }
    }
}

/// Credentials read from the environment. Never written to disk or logs.
#[derive(Default)]
pub struct Secrets {
    pub gemini_api_key: Option<SecretString>,
    pub mongodb_uri: Option<SecretString>,
    pub google_client_id: Option<SecretString>,
    pub google_client_secret: Option<SecretString>,
    pub session_secret: Option<SecretString>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secret = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(SecretString::from)
        };
        Self {
            gemini_api_key: secret("GEMINI_API_KEY"),
            mongodb_uri: secret("MONGODB_URI"),
            google_client_id: secret("GOOGLE_CLIENT_ID"),
            google_client_secret: secret("GOOGLE_CLIENT_SECRET"),
            session_secret: secret("NEXTAUTH_SECRET").or_else(|| secret("SESSION_SECRET")),
        }
    }

    /// Both halves of the identity provider credential are present.
    pub fn has_identity_provider(&self) -> bool {
        self.google_client_id.is_some() && self.google_client_secret.is_some()
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let set = |s: &Option<SecretString>| if s.is_some() { "set" } else { "unset" };
        f.debug_struct("Secrets")
            .field("gemini_api_key", &set(&self.gemini_api_key))
            .field("mongodb_uri", &set(&self.mongodb_uri))
            .field("google_client_id", &set(&self.google_client_id))
            .field("google_client_secret", &set(&self.google_client_secret))
            .field("session_secret", &set(&self.session_secret))
            .finish()
    }
}
