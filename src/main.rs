use std::sync::Arc;

use soundalike::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, Cache, Catalog},
    services::{
        providers::SpotifyProvider, ModelBundle, Preprocessor, Recommender, RecommenderSettings,
    },
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("soundalike=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // Artifacts are loaded once; any inconsistency stops startup
    let bundle = ModelBundle::load(&config.model_path)?;
    let preprocessor = Preprocessor::from_bundle(bundle)?;
    let catalog = Arc::new(Catalog::load(&config.catalog_path, &preprocessor)?);

    let mut recommender = Recommender::new(
        preprocessor,
        catalog,
        RecommenderSettings {
            include_seed_track: config.include_seed_track,
        },
    )?;

    let (cache, cache_handle) = match &config.redis_url {
        Some(url) => {
            let (cache, handle) = Cache::new(create_redis_client(url)?).await;
            (Some(cache), Some(handle))
        }
        None => (None, None),
    };

    match config.spotify_credentials() {
        Some((client_id, client_secret)) => {
            let provider = SpotifyProvider::new(
                client_id,
                client_secret,
                config.spotify_api_url.clone(),
                config.spotify_auth_url.clone(),
                cache,
            );
            recommender = recommender.with_source(Arc::new(provider));
        }
        None => tracing::warn!("Spotify credentials not set, query lookups are disabled"),
    }

    let state = AppState::new(Arc::new(recommender), config.default_top_k);
    let app = create_router(state);

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
