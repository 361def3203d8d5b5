//! Record store abstraction
//!
//! Biodata records live in a single document collection behind the
//! [`RecordStore`] trait. The backend is picked once at startup by
//! [`StorageFactory`] and shared by every handler as a [`SharedStore`].

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod pattern;
pub mod traits;


pub use config::{BackendConfig, BackendType, FileConfig, PostgresConfig, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::{SharedStore, StorageFactory};
pub use pattern::NamePattern;
pub use traits::{HealthStatus, RecordStore};
