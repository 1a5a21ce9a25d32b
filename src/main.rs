use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use adit_auth::builders::session_config_from_lookup;
use adit_auth::core::ReqwestHttpTransport;
use adit_auth::http::{router, AuthState};
use adit_auth::provider::HttpIdentityProvider;
use adit_auth::session::SessionManager;
use adit_auth::token::InMemoryTokenStore;
use adit_auth::user::{InMemoryUserStore, UserResolver};
use adit_auth::ProviderConfigBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PURGE_INTERVAL_SECS: u64 = 3600;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("AUTH_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }
    init_tracing();

    let provider_config = ProviderConfigBuilder::from_env()?.build()?;
    let session_config = session_config_from_lookup(|key| std::env::var(key).ok())?;
    info!(
        provider = %provider_config.name,
        token_mode = ?session_config.token_mode,
        "loaded configuration"
    );

    let transport = Arc::new(ReqwestHttpTransport::with_options(
        provider_config.timeout,
        1_048_576,
    )?);
    let provider = Arc::new(HttpIdentityProvider::new(provider_config, transport));
    let users = Arc::new(UserResolver::new(Arc::new(InMemoryUserStore::new())));
    let manager = Arc::new(SessionManager::new(
        provider,
        Arc::new(InMemoryTokenStore::new()),
        users,
        session_config,
    ));

    let purge_every = std::env::var("AUTH_PURGE_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_PURGE_INTERVAL_SECS);
    let purger = manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(purge_every.max(1)));
        interval.tick().await;
        loop {
            interval.tick().await;
            if let Err(e) = purger.purge_expired().await {
                warn!(error = %e, "token purge failed");
            }
        }
    });

    let addr: SocketAddr = std::env::var("AUTH_BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "auth service listening");

    if let Err(e) = axum::serve(listener, router(AuthState::new(manager))).await {
        error!(error = %e, "server stopped");
        return Err(e.into());
    }
    Ok(())
}
