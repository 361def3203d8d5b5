//! Common test utilities and helpers

#![allow(dead_code)]

use anyhow::Result;
use biodata::pipeline::SubmissionPipeline;
use biodata::processor::{FieldProcessor, ProcessorPool, TrimProcessor};
use biodata::server::{ApiServer, AppState};
use biodata::storage::{SharedStore, StorageFactory};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const LANDING_PAGE: &str = "<html><body>biodata test page</body></html>";

/// Builder for a server bound to an ephemeral local port
pub struct TestServerBuilder {
    processor: Arc<dyn FieldProcessor>,
    max_concurrent: usize,
    queue_timeout: Duration,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        Self {
            processor: Arc::new(TrimProcessor),
            max_concurrent: 16,
            queue_timeout: Duration::from_secs(5),
        }
    }

    /// Use a custom field processor
    pub fn with_processor(mut self, processor: impl FieldProcessor) -> Self {
        self.processor = Arc::new(processor);
        self
    }

    pub fn with_pool(mut self, max_concurrent: usize, queue_timeout: Duration) -> Self {
        self.max_concurrent = max_concurrent;
        self.queue_timeout = queue_timeout;
        self
    }

    /// Start the server
    pub async fn start(self) -> Result<TestServer> {
        let static_dir = TempDir::new()?;
        std::fs::write(static_dir.path().join("index.html"), LANDING_PAGE)?;

        let store = StorageFactory::create_test_storage();
        let pool = ProcessorPool::new(self.processor, self.max_concurrent, self.queue_timeout);
        let pipeline = SubmissionPipeline::new(pool, store.clone());
        let server = ApiServer::new(AppState::new(pipeline, store.clone()), static_dir.path());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let _ = server
                .serve(listener, async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Ok(TestServer {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            store,
            _static_dir: static_dir,
            _shutdown: shutdown_tx,
        })
    }
}

/// Running server; shuts down when dropped
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub store: SharedStore,
    _static_dir: TempDir,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
