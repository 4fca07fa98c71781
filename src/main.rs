use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scoreboard::{
    api,
    config::AppConfig,
    state::{store::JsonFileStore, AppState},
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scoreboard=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting scoreboard...");

    let config = AppConfig::from_env();
    if let Err(e) = tokio::fs::create_dir_all(&config.upload_dir).await {
        tracing::warn!(
            "Could not create upload dir {}: {}",
            config.upload_dir.display(),
            e
        );
    }

    let store = Arc::new(JsonFileStore::new(config.state_file.clone()));
    tracing::info!("Persisting game state to {}", store.path().display());

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState::new(config, store));

    // Pick up the sample sheet when starting without any words
    match state.auto_load_sample().await {
        Ok(Some(count)) => tracing::info!(
            "Auto-loaded {} words from {}",
            count,
            state.config.sample_csv.display()
        ),
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to auto-load sample CSV: {}", e),
    }

    let app = api::router(state);

    tracing::info!("Listening on http://{}", bind_addr);
    tracing::info!("Control: http://{}/control", bind_addr);
    tracing::info!("Display: http://{}/display", bind_addr);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
