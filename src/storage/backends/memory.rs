//! In-memory storage backend for testing

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::record::{BiodataRecord, Payload, RecordId};
use crate::storage::{
    error::{StorageError, StorageResult},
    pattern::NamePattern,
    traits::{HealthStatus, RecordStore},
};

/// In-memory storage backend.
///
/// Records are kept in insertion order; nothing survives a restart.
#[derive(Default, Clone)]
pub struct MemoryBackend {
    records: Arc<RwLock<Vec<BiodataRecord>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryBackend {
    async fn insert(&self, record: BiodataRecord) -> StorageResult<RecordId> {
        let id = record.id.clone();
        self.records.write().await.push(record);
        debug!("Inserted biodata record {}", id);
        Ok(id)
    }

    async fn find_all(&self) -> StorageResult<Vec<BiodataRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn find_by_id(&self, id: &RecordId) -> StorageResult<Option<BiodataRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| &r.id == id)
            .cloned())
    }

    async fn find_by_name(&self, pattern: &NamePattern) -> StorageResult<Vec<BiodataRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| pattern.matches(r))
            .cloned()
            .collect())
    }

    async fn update_by_id(
        &self,
        id: &RecordId,
        patch: &Payload,
    ) -> StorageResult<Option<BiodataRecord>> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| &r.id == id) else {
            return Ok(None);
        };

        record
            .apply_patch(patch)
            .map_err(StorageError::serialization)?;
        debug!("Updated biodata record {}", id);
        Ok(Some(record.clone()))
    }

    async fn delete_by_id(&self, id: &RecordId) -> StorageResult<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| &r.id != id);

        let deleted = records.len() != before;
        if deleted {
            debug!("Deleted biodata record {}", id);
        }
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            backend_type: "memory".to_string(),
            record_count: self.records.read().await.len(),
        })
    }
}
