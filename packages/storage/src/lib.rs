// ABOUTME: Durable JSON record store with pluggable backends
// ABOUTME: Backend trait, file and in-memory implementations, typed repositories, factory

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod backend;
pub mod factory;
pub mod file;
pub mod memory;
pub mod repository;

pub use backend::RecordBackend;
pub use factory::{StorageFactory, StorageManager};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use repository::{Record, Repository};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Invalid collection format in {0}")]
    InvalidFormat(String),
}

impl StorageError {
    /// Persistence faults are retryable-looking and must never be
    /// mistaken for a missing record.
    pub fn is_persistence_fault(&self) -> bool {
        matches!(self, StorageError::Io(_) | StorageError::Json(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Whether write failures propagate or are dropped after logging.
/// Chosen at construction, not toggled at call sites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    Required,
    BestEffort,
}

impl Default for PersistenceMode {
    fn default() -> Self {
        PersistenceMode::Required
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    #[serde(default)]
    pub mode: PersistenceMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::File {
                dir: stagegate_core::stagegate_dir(),
            },
            mode: PersistenceMode::Required,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StorageProvider {
    File { dir: PathBuf },
    Memory,
}

/// On-disk shape of one collection file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionFile {
    pub version: String,
    pub records: Vec<serde_json::Value>,
}

impl Default for CollectionFile {
    fn default() -> Self {
        CollectionFile {
            version: stagegate_core::STORE_VERSION.to_string(),
            records: Vec::new(),
        }
    }
}
