//! Core trait definitions for the record store

use async_trait::async_trait;
use serde::Serialize;

use super::error::StorageResult;
use super::pattern::NamePattern;
use crate::record::{BiodataRecord, Payload, RecordId};

/// Health status of a storage backend
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend_type: String,
    pub record_count: usize,
}

/// Document collection holding biodata records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new record
    async fn insert(&self, record: BiodataRecord) -> StorageResult<RecordId>;

    /// All records, in insertion order
    async fn find_all(&self) -> StorageResult<Vec<BiodataRecord>>;

    /// Load a record by ID
    async fn find_by_id(&self, id: &RecordId) -> StorageResult<Option<BiodataRecord>>;

    /// Records whose name matches a case-insensitive pattern
    async fn find_by_name(&self, pattern: &NamePattern) -> StorageResult<Vec<BiodataRecord>>;

    /// Merge a partial update into an existing record.
    ///
    /// Returns `None` when no record has this ID.
    async fn update_by_id(
        &self,
        id: &RecordId,
        patch: &Payload,
    ) -> StorageResult<Option<BiodataRecord>>;

    /// Delete a record, returning whether one existed
    async fn delete_by_id(&self, id: &RecordId) -> StorageResult<bool>;

    /// Check the health of the storage backend
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}
