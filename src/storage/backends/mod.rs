//! Storage backend implementations

pub mod file;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use file::FileBackend;
pub use memory::MemoryBackend;
#[cfg(feature = "postgres")]
pub use postgres::PostgresBackend;
