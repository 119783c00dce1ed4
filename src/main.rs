//! QR Provisioning Backend
//!
//! A REST backend that provisions QR records with SQLite persistence, an
//! object store for rendered QR images and uploaded media, and saga-style
//! compensation across both.

mod api;
mod config;
mod db;
mod errors;
mod models;
mod qr;
mod storage;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, LogFormat, StorageBackend};
use db::Repository;
use qr::{ContentResolver, QrOrchestrator};
use storage::{LocalObjectStore, ObjectStore, ObjectStoreGateway, S3ObjectStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub orchestrator: Arc<QrOrchestrator>,
    pub content: Arc<ContentResolver>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the QR services around an already opened database and object store.
    pub fn new(repo: Arc<Repository>, store: Arc<dyn ObjectStore>, config: Config) -> Self {
        let gateway = ObjectStoreGateway::new(store);
        let orchestrator = Arc::new(QrOrchestrator::new(
            repo.clone(),
            gateway,
            config.qr_image_size,
        ));

        Self {
            repo,
            content: orchestrator.content(),
            orchestrator,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!("Starting QR Provisioning Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));
    tracing::info!("Database ready with {} QRs", repo.count_qrs().await?);

    // Initialize object store
    let store: Arc<dyn ObjectStore> = match config.storage_backend {
        StorageBackend::Local => {
            tracing::info!("Object store: local directory {:?}", config.storage_path);
            Arc::new(
                LocalObjectStore::new(config.storage_path.clone(), config.public_base_url.clone())
                    .await?,
            )
        }
        StorageBackend::S3 => {
            tracing::info!("Object store: S3 bucket {}", config.s3.bucket);
            Arc::new(S3ObjectStore::new(&config.s3, config.public_base_url.clone()).await)
        }
    };

    // Create application state
    let bind_addr = config.bind_addr;
    let state = AppState::new(repo, store, config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // QRs
        .route("/qrs", get(api::list_qrs).post(api::create_qr))
        .route("/qrs/search/{term}", get(api::search_qrs))
        .route(
            "/qrs/{term}",
            get(api::get_qr).patch(api::update_qr).delete(api::delete_qr),
        )
        // Locations
        .route("/locations", get(api::list_locations))
        .route("/locations", post(api::create_location))
        .route("/locations/{term}", get(api::get_location))
        // Categories
        .route("/categories", get(api::list_categories))
        .route("/categories", post(api::create_category))
        .route("/categories/{id}", get(api::get_category))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    let mut router = Router::new().nest("/api", api_routes).merge(health_routes);

    // Local objects are served by the app itself; S3 objects by the bucket.
    if state.config.storage_backend == StorageBackend::Local {
        router = router.nest_service("/objects", ServeDir::new(&state.config.storage_path));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
