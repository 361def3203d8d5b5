//! # Biodata
//!
//! A small record-management service for biodata (personal and professional
//! profile) records, served over a JSON REST API.
//!
//! ## Usage
//!
//! ```bash
//! biodata serve [--port 4242] [--config biodata.toml] [-v]
//! ```
//!
//! ## Modules
//!
//! - `config` - Server configuration from TOML files and `BIODATA_*` variables
//! - `error` - HTTP-facing error type
//! - `pipeline` - Submission pipeline: process off-thread, then persist
//! - `processor` - Field processors and the bounded per-request thread pool
//! - `record` - Record model and payload coercion
//! - `server` - Axum router, handlers and server lifecycle
//! - `storage` - Record store trait, backends and factory
pub mod config;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod record;
pub mod server;
pub mod storage;

pub use config::ServerConfig;
pub use error::ApiError;
pub use pipeline::SubmissionPipeline;
pub use record::{BiodataFields, BiodataRecord, RecordId};
pub use server::{ApiServer, AppState};
