//! Bounded pool of isolated processor threads
//!
//! Every submission gets a freshly spawned OS thread. The payload is moved in
//! and exactly one outcome comes back over a oneshot channel; a thread that
//! panics drops its sender, which the caller sees as abnormal termination.
//! A semaphore caps how many processor threads exist at once, and callers
//! wait at most `queue_timeout` for a slot before being turned away.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{oneshot, Semaphore};
use tracing::{debug, warn};

use super::{FieldProcessor, ProcessingError};
use crate::record::Payload;

/// Pool of per-request processor threads
#[derive(Clone)]
pub struct ProcessorPool {
    processor: Arc<dyn FieldProcessor>,
    slots: Arc<Semaphore>,
    max_concurrent: usize,
    queue_timeout: Duration,
    spawned: Arc<AtomicU64>,
}

impl ProcessorPool {
    /// Create a pool allowing `max_concurrent` processors at a time.
    ///
    /// A limit of zero is raised to one.
    pub fn new(
        processor: Arc<dyn FieldProcessor>,
        max_concurrent: usize,
        queue_timeout: Duration,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            processor,
            slots: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            queue_timeout,
            spawned: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of processors currently running
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.slots.available_permits()
    }

    /// Run the processor on `payload` in a new isolated thread
    pub async fn run(&self, payload: Payload) -> Result<Payload, ProcessingError> {
        let permit = match tokio::time::timeout(
            self.queue_timeout,
            Arc::clone(&self.slots).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(ProcessingError::Spawn("processor pool is closed".to_string()))
            }
            Err(_) => {
                warn!(
                    "No field processor slot freed up within {:?} ({} running)",
                    self.queue_timeout, self.max_concurrent
                );
                return Err(ProcessingError::Saturated(self.queue_timeout));
            }
        };

        let seq = self.spawned.fetch_add(1, Ordering::Relaxed);
        let processor = Arc::clone(&self.processor);
        let (tx, rx) = oneshot::channel();

        thread::Builder::new()
            .name(format!("field-processor-{}", seq))
            .spawn(move || {
                let _permit = permit;
                let outcome = processor.process(payload);
                // The receiver is gone if the request was cancelled
                let _ = tx.send(outcome);
            })
            .map_err(|e| ProcessingError::Spawn(e.to_string()))?;

        debug!("Dispatched submission to field-processor-{}", seq);

        match rx.await {
            Ok(Ok(processed)) => Ok(processed),
            Ok(Err(fault)) => Err(ProcessingError::Fault(fault.to_string())),
            Err(_) => Err(ProcessingError::AbnormalTermination),
        }
    }
}
