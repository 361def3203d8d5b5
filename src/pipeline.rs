//! Submission pipeline: validate, process off-thread, persist.
//!
//! Processing strictly precedes persistence, and the insert is only attempted
//! once processing and coercion both succeeded, so a failed submission never
//! leaves a record behind.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::processor::ProcessorPool;
use crate::record::{coerce_payload, BiodataFields, BiodataRecord, RecordId};
use crate::storage::SharedStore;

/// Orchestrates one create request end to end
#[derive(Clone)]
pub struct SubmissionPipeline {
    processors: ProcessorPool,
    store: SharedStore,
}

impl SubmissionPipeline {
    pub fn new(processors: ProcessorPool, store: SharedStore) -> Self {
        Self { processors, store }
    }

    pub fn processors(&self) -> &ProcessorPool {
        &self.processors
    }

    /// Process and store one submission, returning the new record's ID
    pub async fn submit(&self, body: Value) -> Result<RecordId, ApiError> {
        let Value::Object(payload) = body else {
            return Err(ApiError::validation("Submission must be a JSON object"));
        };

        // Reject uncoercible input before spending a processor on it
        coerce_payload(&payload)?;

        let processed = self.processors.run(payload).await?;
        debug!("Submission processed ({} fields)", processed.len());

        let fields = BiodataFields::from_payload(&processed)?;
        let id = self.store.insert(BiodataRecord::new(fields)).await?;

        info!("Stored biodata record {}", id);
        Ok(id)
    }
}
