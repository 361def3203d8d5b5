//! PostgreSQL storage backend
//!
//! Each record is stored as a JSONB document keyed by its ID, with a serial
//! column preserving insertion order.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use crate::record::{BiodataRecord, Payload, RecordId};
use crate::storage::{
    config::PostgresConfig,
    error::{StorageError, StorageResult},
    pattern::NamePattern,
    traits::{HealthStatus, RecordStore},
};

/// PostgreSQL storage backend
pub struct PostgresBackend {
    pool: PgPool,
    table: String,
}

impl PostgresBackend {
    /// Connect and make sure the collection table exists
    pub async fn new(config: &PostgresConfig) -> StorageResult<Self> {
        info!("Initializing PostgreSQL backend");

        let connect_options = PgConnectOptions::from_str(&config.connection_string)
            .map_err(|e| StorageError::connection(format!("Invalid connection string: {}", e)))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StorageError::connection(format!("Failed to connect to database: {}", e)))?;

        let backend = Self {
            pool,
            table: config.table.clone(),
        };
        backend.initialize_schema().await?;

        Ok(backend)
    }

    async fn initialize_schema(&self) -> StorageResult<()> {
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id TEXT PRIMARY KEY,
                seq BIGSERIAL,
                data JSONB NOT NULL
            )
            "#,
            self.table
        );
        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::database(format!("Failed to create table: {}", e)))?;
        Ok(())
    }

    fn decode_rows(rows: Vec<sqlx::postgres::PgRow>) -> StorageResult<Vec<BiodataRecord>> {
        rows.into_iter().map(|row| Self::decode_row(&row)).collect()
    }

    fn decode_row(row: &sqlx::postgres::PgRow) -> StorageResult<BiodataRecord> {
        let data: String = row.try_get("data").map_err(StorageError::database)?;
        serde_json::from_str(&data).map_err(StorageError::serialization)
    }
}

#[async_trait]
impl RecordStore for PostgresBackend {
    async fn insert(&self, record: BiodataRecord) -> StorageResult<RecordId> {
        let data = serde_json::to_string(&record)?;
        let query = format!("INSERT INTO {} (id, data) VALUES ($1, $2::jsonb)", self.table);

        sqlx::query(&query)
            .bind(record.id.as_str())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(StorageError::database)?;

        debug!("Inserted biodata record {}", record.id);
        Ok(record.id)
    }

    async fn find_all(&self) -> StorageResult<Vec<BiodataRecord>> {
        let query = format!("SELECT data::text AS data FROM {} ORDER BY seq", self.table);
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::database)?;
        Self::decode_rows(rows)
    }

    async fn find_by_id(&self, id: &RecordId) -> StorageResult<Option<BiodataRecord>> {
        let query = format!("SELECT data::text AS data FROM {} WHERE id = $1", self.table);
        let row = sqlx::query(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::database)?;
        row.as_ref().map(Self::decode_row).transpose()
    }

    // Postgres `~*` speaks a different regex dialect, so names are matched
    // here with the same engine the other backends use.
    async fn find_by_name(&self, pattern: &NamePattern) -> StorageResult<Vec<BiodataRecord>> {
        let mut records = self.find_all().await?;
        records.retain(|r| pattern.matches(r));
        Ok(records)
    }

    async fn update_by_id(
        &self,
        id: &RecordId,
        patch: &Payload,
    ) -> StorageResult<Option<BiodataRecord>> {
        let mut tx = self.pool.begin().await.map_err(StorageError::database)?;

        let select = format!(
            "SELECT data::text AS data FROM {} WHERE id = $1 FOR UPDATE",
            self.table
        );
        let Some(row) = sqlx::query(&select)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(StorageError::database)?
        else {
            return Ok(None);
        };

        let mut record = Self::decode_row(&row)?;
        record
            .apply_patch(patch)
            .map_err(StorageError::serialization)?;

        let update = format!("UPDATE {} SET data = $2::jsonb WHERE id = $1", self.table);
        sqlx::query(&update)
            .bind(id.as_str())
            .bind(serde_json::to_string(&record)?)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::database)?;

        tx.commit().await.map_err(StorageError::database)?;
        debug!("Updated biodata record {}", id);
        Ok(Some(record))
    }

    async fn delete_by_id(&self, id: &RecordId) -> StorageResult<bool> {
        let query = format!("DELETE FROM {} WHERE id = $1", self.table);
        let result = sqlx::query(&query)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(StorageError::database)?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            debug!("Deleted biodata record {}", id);
        }
        Ok(deleted)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let query = format!("SELECT COUNT(*) AS count FROM {}", self.table);
        let row = sqlx::query(&query)
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::unavailable)?;
        let count: i64 = row.try_get("count").map_err(StorageError::database)?;

        Ok(HealthStatus {
            healthy: true,
            backend_type: "postgres".to_string(),
            record_count: usize::try_from(count).unwrap_or_default(),
        })
    }
}
