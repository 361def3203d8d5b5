//! Server configuration
//!
//! Values are resolved in order: built-in defaults, an optional TOML file,
//! then `BIODATA_*` environment variables. CLI flags are applied last by the
//! binary.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::processor::ProcessorKind;
use crate::storage::{BackendConfig, BackendType, FileConfig, PostgresConfig, StorageConfig};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Field processor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Transformation applied to submissions
    #[serde(default)]
    pub kind: ProcessorKind,

    /// Maximum number of processors running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// How long a submission waits for a free processor slot
    #[serde(with = "humantime_serde", default = "default_queue_timeout")]
    pub queue_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            kind: ProcessorKind::default(),
            max_concurrent: default_max_concurrent(),
            queue_timeout: default_queue_timeout(),
        }
    }
}

/// Top-level server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding `index.html` and other static assets
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    #[serde(default)]
    pub processor: ProcessorConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            processor: ProcessorConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded configuration from {}", path.display());
        Ok(toml::from_str(&content)?)
    }

    /// Apply `BIODATA_*` overrides from an arbitrary variable source
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BIODATA_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("BIODATA_PORT") {
            self.port = parse_value("BIODATA_PORT", &port)?;
        }
        if let Some(dir) = lookup("BIODATA_STATIC_DIR") {
            self.static_dir = PathBuf::from(dir);
        }
        if let Some(max) = lookup("BIODATA_MAX_PROCESSORS") {
            self.processor.max_concurrent = parse_value("BIODATA_MAX_PROCESSORS", &max)?;
        }

        if let Some(kind) = lookup("BIODATA_STORAGE_TYPE") {
            let backend = BackendType::parse(&kind).ok_or_else(|| ConfigError::InvalidValue {
                key: "BIODATA_STORAGE_TYPE".to_string(),
                value: kind.clone(),
                reason: "expected file, memory or postgres".to_string(),
            })?;
            self.storage.backend = backend;
        }

        match self.storage.backend {
            BackendType::File => {
                if let Some(path) = lookup("BIODATA_STORAGE_PATH") {
                    self.storage.backend_config =
                        BackendConfig::File(FileConfig { path: PathBuf::from(path) });
                } else if !matches!(self.storage.backend_config, BackendConfig::File(_)) {
                    self.storage.backend_config = BackendConfig::File(FileConfig::default());
                }
            }
            BackendType::Memory => {
                self.storage.backend_config = BackendConfig::Memory(Default::default());
            }
            BackendType::Postgres => {
                if let Some(url) = lookup("BIODATA_DATABASE_URL") {
                    self.storage.backend_config = BackendConfig::Postgres(PostgresConfig::new(url));
                }
            }
        }

        self.validate()?;
        debug!("Resolved configuration: {:?}", self);
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.processor.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                key: "processor.max_concurrent".to_string(),
                value: "0".to_string(),
                reason: "at least one processor is required".to_string(),
            });
        }
        self.socket_addr().map(|_| ())
    }

    /// First address `host` resolves to. Hostnames and bare IPv6 literals
    /// are both accepted.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: "host".to_string(),
            value: self.host.clone(),
            reason,
        };

        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| invalid(e.to_string()))?
            .next()
            .ok_or_else(|| invalid("host resolved to no addresses".to_string()))
    }

    /// Render as TOML, for `check-config`
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4242
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_max_concurrent() -> usize {
    64
}

fn default_queue_timeout() -> Duration {
    Duration::from_secs(5)
}
