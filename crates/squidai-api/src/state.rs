//! Application state wiring the relay, session store and telemetry sink.
//!
//! Services are generic over provider/repository traits; AppState pins them
//! to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use squidai_core::chat::service::SessionService;
use squidai_core::relay::cooldown::CooldownGate;
use squidai_core::relay::service::ChatRelay;
use squidai_infra::config::Secrets;
use squidai_infra::gemini::GeminiProvider;
use squidai_infra::mongo;
use squidai_infra::store::{
    FileSessionRepository, InMemorySessionRepository, LocalSessionRepository,
    MongoSessionRepository, MongoTelemetryRepository,
};
use squidai_types::config::{AppConfig, LocalStoreKind};

pub type ConcreteRelay = ChatRelay<GeminiProvider>;

pub type ConcreteSessionService = SessionService<LocalSessionRepository, MongoSessionRepository>;

/// Shared state for every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ConcreteRelay>,
    pub sessions: Arc<ConcreteSessionService>,
    /// `None` when no document store is connected; telemetry is then dropped.
    pub telemetry: Option<Arc<MongoTelemetryRepository>>,
    pub config: Arc<AppConfig>,
    pub secrets: Arc<Secrets>,
}

impl AppState {
    /// Build the state: Gemini client, MongoDB (if configured and reachable),
    /// and the local session fallback.
    pub async fn init(config: AppConfig, secrets: Secrets, data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let provider = match &secrets.gemini_api_key {
            Some(key) => Some(GeminiProvider::new(key.clone(), &config.upstream)?),
            None => {
                tracing::warn!("GEMINI_API_KEY is not set; chat requests will be refused");
                None
            }
        };

        let database =
            mongo::connect_optional(secrets.mongodb_uri.as_ref(), &config.store.database_name).await;
        let (durable, telemetry) = match database {
            Some(database) => {
                let sessions = MongoSessionRepository::new(database.clone());
                sessions.ensure_indexes().await;
                (
                    Some(sessions),
                    Some(Arc::new(MongoTelemetryRepository::new(database))),
                )
            }
            None => (None, None),
        };

        let local = local_store(&config, &data_dir);
        Ok(Self::new(provider, local, durable, telemetry, config, secrets))
    }

    /// Assemble state from already-built parts.
    pub fn new(
        provider: Option<GeminiProvider>,
        local: LocalSessionRepository,
        durable: Option<MongoSessionRepository>,
        telemetry: Option<Arc<MongoTelemetryRepository>>,
        config: AppConfig,
        secrets: Secrets,
    ) -> Self {
        let cooldown = Arc::new(CooldownGate::new(Duration::from_millis(config.relay.cooldown_ms)));
        Self {
            relay: Arc::new(ChatRelay::new(provider, cooldown)),
            sessions: Arc::new(SessionService::new(local, durable)),
            telemetry,
            config: Arc::new(config),
            secrets: Arc::new(secrets),
        }
    }
}

fn local_store(config: &AppConfig, data_dir: &std::path::Path) -> LocalSessionRepository {
    match config.store.local {
        LocalStoreKind::File => {
            let path = data_dir.join(&config.store.local_file);
            tracing::info!(path = %path.display(), "Using local session file");
            LocalSessionRepository::File(FileSessionRepository::new(path))
        }
        LocalStoreKind::Memory => {
            tracing::info!("Using in-memory session store");
            LocalSessionRepository::Memory(InMemorySessionRepository::new())
        }
    }
}
