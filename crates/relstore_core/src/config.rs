//! Store and logging configuration.
//!
//! # Responsibility
//! - Describe where the database lives and how sessions are tuned.
//! - Parse configuration from JSON documents with serde defaults.
//!
//! # Invariants
//! - A validated config always has a non-zero busy timeout.
//! - In-memory database names are restricted to `[A-Za-z0-9_-]` so they can
//!   be embedded in a SQLite URI unescaped.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use uuid::Uuid;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_LOG_FILES: usize = 5;

/// Configuration parse/validation error.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Physical location of the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatabaseLocation {
    /// SQLite database file. Parent directories are created on bootstrap.
    File { path: PathBuf },
    /// Named shared-cache in-memory database, alive while its factory lives.
    Memory { name: String },
}

impl DatabaseLocation {
    /// Short label used in log events.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::Memory { .. } => "memory",
        }
    }
}

/// Session factory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database: DatabaseLocation,
    /// How long a session waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
    /// Enables WAL journaling for file databases. Ignored in memory.
    pub wal: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl StoreConfig {
    /// File-backed config with default tuning.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_location(DatabaseLocation::File { path: path.into() })
    }

    /// Private in-memory database with a generated unique name.
    pub fn in_memory() -> Self {
        Self::named_memory(format!("relstore-{}", Uuid::new_v4().simple()))
    }

    /// In-memory database addressed by name.
    pub fn named_memory(name: impl Into<String>) -> Self {
        Self::with_location(DatabaseLocation::Memory { name: name.into() })
    }

    fn with_location(database: DatabaseLocation) -> Self {
        Self {
            database,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
            wal: true,
        }
    }

    /// Parses and validates a JSON config document.
    ///
    /// Missing fields fall back to `StoreConfig::default()`.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks field-level invariants.
    ///
    /// # Errors
    /// - `busy_timeout_ms` is zero.
    /// - File path is empty, or memory name is empty or contains characters
    ///   outside `[A-Za-z0-9_-]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "busy_timeout_ms must be greater than zero".to_string(),
            ));
        }

        match &self.database {
            DatabaseLocation::File { path } if path.as_os_str().is_empty() => Err(
                ConfigError::Invalid("database file path cannot be empty".to_string()),
            ),
            DatabaseLocation::Memory { name } if name.is_empty() => Err(ConfigError::Invalid(
                "in-memory database name cannot be empty".to_string(),
            )),
            DatabaseLocation::Memory { name }
                if !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
            {
                Err(ConfigError::Invalid(format!(
                    "in-memory database name `{name}` may only contain [A-Za-z0-9_-]"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Rolling file logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for log files.
    pub directory: PathBuf,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            directory: directory.into(),
            max_file_bytes: DEFAULT_MAX_LOG_FILE_BYTES,
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }
}

fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_LOG_FILE_BYTES
}

fn default_max_files() -> usize {
    DEFAULT_MAX_LOG_FILES
}
