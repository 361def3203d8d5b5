//! HTTP surface for the biodata API

pub mod handlers;

use anyhow::{Context, Result};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::pipeline::SubmissionPipeline;
use crate::processor::ProcessorPool;
use crate::storage::{SharedStore, StorageFactory};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: SubmissionPipeline,
    pub store: SharedStore,
}

impl AppState {
    pub fn new(pipeline: SubmissionPipeline, store: SharedStore) -> Self {
        Self { pipeline, store }
    }
}

/// API server for biodata endpoints
pub struct ApiServer {
    state: AppState,
    static_dir: PathBuf,
}

impl ApiServer {
    /// Create a server around an existing state
    pub fn new(state: AppState, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            state,
            static_dir: static_dir.into(),
        }
    }

    /// Open the configured store and processor pool
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        let store = StorageFactory::from_config(&config.storage)
            .await
            .context("Failed to open record store")?;

        let processors = ProcessorPool::new(
            config.processor.kind.build(),
            config.processor.max_concurrent,
            config.processor.queue_timeout,
        );
        let pipeline = SubmissionPipeline::new(processors, store.clone());

        Ok(Self::new(
            AppState::new(pipeline, store),
            config.static_dir.clone(),
        ))
    }

    /// Build API router
    pub fn router(&self) -> Router {
        build_router(self.state.clone(), &self.static_dir)
    }

    /// Bind `host:port` and serve until Ctrl+C
    pub async fn start(self, host: &str, port: u16) -> Result<()> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {} port {}", host, port))?;
        info!("Server running at http://{}", listener.local_addr()?);

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("Server error")?;
        info!("Server stopped");
        Ok(())
    }
}

/// Build the route table
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/submit", post(handlers::submit))
        .route("/getAll", get(handlers::get_all))
        .route("/get/{id}", get(handlers::get_by_id))
        .route("/getByName", get(handlers::get_by_name))
        .route("/update/{id}", put(handlers::update))
        .route("/delete/{id}", delete(handlers::delete_record))
        .route("/health", get(handlers::health))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested, draining in-flight requests");
    }
}
