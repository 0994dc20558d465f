use anyhow::Result;
use cryptogame::{
    AppState, Dispatcher, Narrator, OpenAIGenerator, RedisBackend, SessionKeys, SessionStore,
    Settings, build_router, logging,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;
    logging::init(logging::parse_level(&settings.log_level), settings.log_file.clone())?;

    log::info!("Cryptogame v{}", env!("CARGO_PKG_VERSION"));

    let backend = RedisBackend::connect(&settings.redis_url).await?;
    let store = SessionStore::new(Arc::new(backend), settings.key_prefix.clone());
    if !store.is_healthy().await {
        log::warn!("Session store did not answer PING; requests will get retry-later replies until it does");
    }

    let generator = OpenAIGenerator::new(&settings)?;
    let narrator = Narrator::from_settings(Arc::new(generator), &settings);

    let keys = match &settings.session_secret {
        Some(secret) => SessionKeys::new(secret)?,
        None => {
            log::warn!("No session secret configured; session ids will not survive a restart");
            SessionKeys::ephemeral()?
        }
    };

    let app = build_router(AppState::new(Dispatcher::new(store, narrator, keys)));

    log::info!("Starting HTTP server on {}", settings.bind_addr);
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Cryptogame exit: {}", chrono::Local::now());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
