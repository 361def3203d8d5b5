//! Storage factory for creating record store instances

use std::sync::Arc;

use super::backends::{FileBackend, MemoryBackend};
#[cfg(feature = "postgres")]
use super::backends::PostgresBackend;
use super::config::{BackendConfig, BackendType, FileConfig, StorageConfig};
use super::error::{StorageError, StorageResult};
use super::traits::RecordStore;

/// Shared handle to the record store, injected into every request handler
pub type SharedStore = Arc<dyn RecordStore>;

/// Factory for creating record stores
pub struct StorageFactory;

impl StorageFactory {
    /// Create a record store from explicit configuration
    pub async fn from_config(config: &StorageConfig) -> StorageResult<SharedStore> {
        match &config.backend {
            BackendType::File => {
                let file_config = match &config.backend_config {
                    BackendConfig::File(cfg) => cfg.clone(),
                    BackendConfig::Memory(_) => FileConfig::default(),
                    BackendConfig::Postgres(_) => {
                        return Err(StorageError::configuration(
                            "Invalid backend config for file storage",
                        ))
                    }
                };
                Ok(Arc::new(FileBackend::new(&file_config).await?))
            }
            BackendType::Memory => Ok(Arc::new(MemoryBackend::new())),
            #[cfg(feature = "postgres")]
            BackendType::Postgres => {
                if let BackendConfig::Postgres(ref pg_config) = config.backend_config {
                    Ok(Arc::new(PostgresBackend::new(pg_config).await?))
                } else {
                    Err(StorageError::configuration(
                        "Invalid backend configuration for PostgreSQL",
                    ))
                }
            }
            #[cfg(not(feature = "postgres"))]
            BackendType::Postgres => Err(StorageError::configuration(
                "PostgreSQL backend not enabled. Enable with --features postgres",
            )),
        }
    }

    /// Create a test store (memory backend)
    pub fn create_test_storage() -> SharedStore {
        Arc::new(MemoryBackend::new())
    }
}
