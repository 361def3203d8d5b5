//! File-based storage backend
//!
//! The whole collection lives in one JSON array file. It is loaded once when
//! the backend opens, served from memory, and rewritten on every mutation by
//! writing a sibling temp file and renaming it into place, so the file on
//! disk is always a complete collection.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::record::{BiodataRecord, Payload, RecordId};
use crate::storage::{
    config::FileConfig,
    error::{StorageError, StorageResult},
    pattern::NamePattern,
    traits::{HealthStatus, RecordStore},
};

/// File-based storage backend
pub struct FileBackend {
    path: PathBuf,
    records: Arc<RwLock<Vec<BiodataRecord>>>,
}

impl FileBackend {
    /// Open the collection file, creating its directory if needed
    pub async fn new(config: &FileConfig) -> StorageResult<Self> {
        let path = config.path.clone();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let records = Self::load(&path).await?;
        info!(
            "Opened biodata collection at {} ({} records)",
            path.display(),
            records.len()
        );

        Ok(Self {
            path,
            records: Arc::new(RwLock::new(records)),
        })
    }

    async fn load(path: &Path) -> StorageResult<Vec<BiodataRecord>> {
        match fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => serde_json::from_str(&content).map_err(StorageError::serialization),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Write the collection atomically. Called with the write lock held.
    async fn persist(&self, records: &[BiodataRecord]) -> StorageResult<()> {
        let content = serde_json::to_vec_pretty(records)?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &content))
            .await
            .map_err(|e| StorageError::database(format!("Persist task failed: {}", e)))?
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> StorageResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl RecordStore for FileBackend {
    async fn insert(&self, record: BiodataRecord) -> StorageResult<RecordId> {
        let mut records = self.records.write().await;
        let id = record.id.clone();
        records.push(record);

        if let Err(e) = self.persist(&records).await {
            records.pop();
            return Err(e);
        }

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
        let Some(index) = records.iter().position(|r| &r.id == id) else {
            return Ok(None);
        };

        let previous = records[index].clone();
        records[index]
            .apply_patch(patch)
            .map_err(StorageError::serialization)?;

        if let Err(e) = self.persist(&records).await {
            records[index] = previous;
            return Err(e);
        }

        debug!("Updated biodata record {}", id);
        Ok(Some(records[index].clone()))
    }

    async fn delete_by_id(&self, id: &RecordId) -> StorageResult<bool> {
        let mut records = self.records.write().await;
        let Some(index) = records.iter().position(|r| &r.id == id) else {
            return Ok(false);
        };

        let removed = records.remove(index);
        if let Err(e) = self.persist(&records).await {
            records.insert(index, removed);
            return Err(e);
        }

        debug!("Deleted biodata record {}", id);
        Ok(true)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let dir_ok = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => fs::metadata(dir).await.map(|m| m.is_dir()).unwrap_or(false),
            None => true,
        };

        Ok(HealthStatus {
            healthy: dir_ok,
            backend_type: "file".to_string(),
            record_count: self.records.read().await.len(),
        })
    }
}
