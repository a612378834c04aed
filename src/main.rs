use secretmessage::{
    config::{AppConfig, StoreBackend},
    exchange::ExchangeEngine,
    secret::{MemoryStore, RedisStore, SharedSecretStore},
    slack::{RequestVerifier, SlackClient, TeamClientCache},
    web::{self, AppState},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging first
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secretmessage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Secret Message v{}", env!("CARGO_PKG_VERSION"));

    dotenvy::dotenv().ok();
    let config = AppConfig::init()?;
    info!("Configuration loaded");

    let store = create_store(config).await?;

    let slack = SlackClient::from_config(config)
        .map_err(|e| anyhow::anyhow!("Failed to create Slack client: {}", e))?;
    info!("Slack client initialized");

    // The installation check makes a store lookup and up to two Slack
    // calls per attempt, each bounded by the http timeout
    let notice_timeout = config.http.timeout() * 4;
    let engine = ExchangeEngine::new(
        store,
        Arc::new(slack),
        Arc::new(TeamClientCache::new()),
        config.slack.reinstall_url(),
        notice_timeout,
    );

    let mut verifier = RequestVerifier::new(
        &config.slack.signing_secret,
        Duration::from_secs(config.slack.timestamp_tolerance_secs),
    );
    if config.slack.skip_signature_validation {
        verifier = verifier.skip_verification();
    }
    if verifier.is_skipping() {
        warn!("Slack signature validation is DISABLED. Never run like this in production.");
    }

    let app = web::create_router(AppState {
        engine,
        verifier: Arc::new(verifier),
    });

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn create_store(config: &AppConfig) -> anyhow::Result<SharedSecretStore> {
    let store: SharedSecretStore = match config.store.backend {
        StoreBackend::Redis => {
            let store = RedisStore::connect(
                &config.store.redis_url,
                config.http.timeout(),
                config.store.secret_ttl_secs.map(Duration::from_secs),
            )
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Redis: {}", e))?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; secrets are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}
