// ABOUTME: Factory and manager wiring a configured backend to typed repositories
// ABOUTME: Provider choice and persistence mode are fixed at construction time

use std::sync::Arc;
use tracing::{debug, info};

use crate::backend::RecordBackend;
use crate::file::FileBackend;
use crate::memory::MemoryBackend;
use crate::repository::{Record, Repository};
use crate::{PersistenceMode, StorageConfig, StorageProvider, StorageResult};

/// Factory for creating record backends
pub struct StorageFactory;

impl StorageFactory {
    /// Create a new backend instance from configuration
    pub async fn create_backend(config: &StorageConfig) -> StorageResult<Arc<dyn RecordBackend>> {
        debug!("Creating storage with provider: {:?}", config.provider);

        match &config.provider {
            StorageProvider::File { dir } => {
                info!("Initializing file storage at: {:?}", dir);
                let backend = FileBackend::new(dir.clone());
                backend.initialize().await?;
                Ok(Arc::new(backend))
            }
            StorageProvider::Memory => {
                info!("Initializing in-memory storage");
                let backend = MemoryBackend::new();
                backend.initialize().await?;
                Ok(Arc::new(backend))
            }
        }
    }
}

/// Holds the active backend and hands out typed repositories.
pub struct StorageManager {
    backend: Arc<dyn RecordBackend>,
    config: StorageConfig,
}

impl StorageManager {
    /// Create a new storage manager with the given configuration
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let backend = StorageFactory::create_backend(&config).await?;
        Ok(Self { backend, config })
    }

    /// Create a storage manager with default configuration
    pub async fn with_defaults() -> StorageResult<Self> {
        Self::new(StorageConfig::default()).await
    }

    /// In-memory manager for tests and ephemeral use.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::new(StorageConfig {
            provider: StorageProvider::Memory,
            mode: PersistenceMode::Required,
        })
        .await
    }

    /// Typed repository for one record type.
    pub fn repository<T: Record>(&self) -> Repository<T> {
        Repository::new(self.backend.clone(), self.config.mode)
    }

    pub fn backend(&self) -> Arc<dyn RecordBackend> {
        self.backend.clone()
    }

    /// Get the current configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagegate_core::{Submission, SubmissionCreateInput, WorkflowState};

    fn sample_submission() -> Submission {
        let input = SubmissionCreateInput {
            title: "Fleet renewal".to_string(),
            description: None,
            entity_type: None,
            business_sponsor: None,
            business_delegate: None,
            tech_sponsor: None,
            finance_sponsor: None,
            benefits_sponsor: None,
            created_by: "u-9".to_string(),
        };
        let now = chrono::Utc::now();
        Submission {
            id: stagegate_core::generate_record_id(),
            title: input.title,
            description: input.description,
            budget: None,
            stage: None,
            status: None,
            workflow: WorkflowState::default(),
            business_sponsor: None,
            business_delegate: None,
            tech_sponsor: None,
            finance_sponsor: None,
            benefits_sponsor: None,
            sponsor_name: None,
            sponsor_email: None,
            approval_stages: Vec::new(),
            assignments: Vec::new(),
            audit_trail: Vec::new(),
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_memory_manager_stores_submissions() {
        let manager = StorageManager::in_memory().await.unwrap();
        let repo = manager.repository::<Submission>();

        let submission = sample_submission();
        repo.put(&submission).await.unwrap();

        let loaded = repo.require(&submission.id).await.unwrap();
        assert_eq!(loaded.title, "Fleet renewal");
    }

    #[tokio::test]
    async fn test_file_manager_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            provider: StorageProvider::File {
                dir: tmp.path().join("store"),
            },
            mode: PersistenceMode::Required,
        };
        let manager = StorageManager::new(config).await.unwrap();
        let repo = manager.repository::<Submission>();

        let submission = sample_submission();
        repo.put(&submission).await.unwrap();

        let loaded = repo.get(&submission.id).await.unwrap();
        assert!(loaded.is_some());
    }
}
