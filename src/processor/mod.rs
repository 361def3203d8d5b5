//! Field processing for submissions
//!
//! A [`FieldProcessor`] turns a raw submission payload into the payload that
//! gets stored. Processors run on their own thread via [`ProcessorPool`] and
//! only ever see an owned copy of the payload.

pub mod worker;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::record::Payload;

pub use worker::ProcessorPool;

/// A processor rejected its input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ProcessingFault(pub String);

impl ProcessingFault {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Reasons a payload could not be processed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    /// No isolated context could be started
    #[error("Failed to start field processor: {0}")]
    Spawn(String),

    /// The processor reported a fault
    #[error("Field processor fault: {0}")]
    Fault(String),

    /// The processor's context ended without reporting a result
    #[error("Field processor terminated abnormally")]
    AbnormalTermination,

    /// Every processor slot stayed busy for the whole queue timeout
    #[error("All field processors busy for {0:?}")]
    Saturated(Duration),
}

/// Transformation applied to every submission before it is stored.
///
/// Implementations must tolerate missing and unknown fields and keep every
/// field they do not explicitly transform.
pub trait FieldProcessor: Send + Sync + 'static {
    fn process(&self, payload: Payload) -> Result<Payload, ProcessingFault>;
}

impl<F> FieldProcessor for F
where
    F: Fn(Payload) -> Result<Payload, ProcessingFault> + Send + Sync + 'static,
{
    fn process(&self, payload: Payload) -> Result<Payload, ProcessingFault> {
        self(payload)
    }
}

/// Returns the payload unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProcessor;

impl FieldProcessor for IdentityProcessor {
    fn process(&self, payload: Payload) -> Result<Payload, ProcessingFault> {
        Ok(payload)
    }
}

/// Trims surrounding whitespace from every string value
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimProcessor;

impl FieldProcessor for TrimProcessor {
    fn process(&self, payload: Payload) -> Result<Payload, ProcessingFault> {
        Ok(payload
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => (key, Value::String(s.trim().to_string())),
                other => (key, other),
            })
            .collect())
    }
}

/// Built-in processors selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessorKind {
    Identity,
    #[default]
    Trim,
}

impl ProcessorKind {
    pub fn build(self) -> Arc<dyn FieldProcessor> {
        match self {
            Self::Identity => Arc::new(IdentityProcessor),
            Self::Trim => Arc::new(TrimProcessor),
        }
    }
}
