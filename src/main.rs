use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ministry_scales::{
    config::StoreBackend,
    db, handlers, startup,
    stores::MemoryDirectory,
    AppConfig, AppState, Stores,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with conditional JSON/text output
    let use_json = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| "text".to_string()) == "json";

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,ministry_scales=debug,tower_http=debug".into());

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {}", e);
        e
    })?;

    let stores = match config.store_backend {
        StoreBackend::Postgres => {
            let database_url = config.database_url.as_deref().unwrap_or_default();
            let pool = db::create_pool(database_url).await.map_err(|e| {
                tracing::error!("Failed to create database pool: {}", e);
                e
            })?;
            db::run_migrations(&pool).await.map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
            tracing::info!("Database pool created and migrations applied");
            Stores::postgres(pool)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            Stores::memory(Arc::new(MemoryDirectory::new()))
        }
    };

    let metrics_state = Arc::new(handlers::setup_metrics_recorder()?);
    tracing::info!("Metrics recorder initialized");

    let port = config.port;
    let state = Arc::new(AppState::new(config, stores, metrics_state));
    let app = startup::build_router(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
