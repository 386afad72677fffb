// ABOUTME: Typed repository over the record backend, one per entity type
// ABOUTME: Upserts by id with read-modify-write; persistence mode decides write-failure handling

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::backend::RecordBackend;
use crate::{PersistenceMode, StorageError, StorageResult};

/// A record type persisted in its own named collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection name the records live under.
    const COLLECTION: &'static str;

    fn record_id(&self) -> &str;
}

impl Record for stagegate_core::Submission {
    const COLLECTION: &'static str = "submissions";

    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Typed read/write access to one collection.
pub struct Repository<T> {
    backend: Arc<dyn RecordBackend>,
    mode: PersistenceMode,
    _marker: PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            mode: self.mode,
            _marker: PhantomData,
        }
    }
}

impl<T: Record> Repository<T> {
    pub fn new(backend: Arc<dyn RecordBackend>, mode: PersistenceMode) -> Self {
        Self {
            backend,
            mode,
            _marker: PhantomData,
        }
    }

    /// All records in the collection. Records that no longer deserialize
    /// are skipped in best-effort mode and fail the read in required mode.
    pub async fn list(&self) -> StorageResult<Vec<T>> {
        let raw = match self.backend.read_collection(T::COLLECTION).await {
            Ok(raw) => raw,
            Err(e) if self.mode == PersistenceMode::BestEffort => {
                warn!(
                    "Best-effort read of {} failed, returning empty: {}",
                    T::COLLECTION,
                    e
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut records = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<T>(value) {
                Ok(record) => records.push(record),
                Err(e) if self.mode == PersistenceMode::BestEffort => {
                    warn!("Skipping undeserializable {} record: {}", T::COLLECTION, e);
                }
                Err(e) => return Err(StorageError::Json(e)),
            }
        }
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<T>> {
        let records = self.list().await?;
        Ok(records.into_iter().find(|r| r.record_id() == id))
    }

    /// Like `get`, but a missing record is an error the caller can map to
    /// a 404-equivalent outcome.
    pub async fn require(&self, id: &str) -> StorageResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", T::COLLECTION, id)))
    }

    /// Insert or replace one record by id.
    pub async fn put(&self, record: &T) -> StorageResult<()> {
        let mut records = self.list().await?;
        match records.iter_mut().find(|r| r.record_id() == record.record_id()) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.write_all(&records).await
    }

    /// Replace the whole collection.
    pub async fn write_all(&self, records: &[T]) -> StorageResult<()> {
        let raw: Result<Vec<serde_json::Value>, serde_json::Error> =
            records.iter().map(serde_json::to_value).collect();
        let raw = raw?;

        match self.backend.write_collection(T::COLLECTION, &raw).await {
            Ok(()) => {
                debug!("Wrote {} records to {}", raw.len(), T::COLLECTION);
                Ok(())
            }
            Err(e) if self.mode == PersistenceMode::BestEffort => {
                warn!(
                    "Best-effort write of {} dropped ({} records): {}",
                    T::COLLECTION,
                    raw.len(),
                    e
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Widget {
        id: String,
        label: String,
    }

    impl Record for Widget {
        const COLLECTION: &'static str = "widgets";

        fn record_id(&self) -> &str {
            &self.id
        }
    }

    fn repo() -> Repository<Widget> {
        Repository::new(Arc::new(MemoryBackend::new()), PersistenceMode::Required)
    }

    #[tokio::test]
    async fn test_put_is_upsert_by_id() {
        let repo = repo();
        let mut widget = Widget {
            id: "w1".to_string(),
            label: "first".to_string(),
        };
        repo.put(&widget).await.unwrap();

        widget.label = "second".to_string();
        repo.put(&widget).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].label, "second");
    }

    #[tokio::test]
    async fn test_require_missing_is_not_found() {
        let repo = repo();
        let err = repo.require("nope").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
        assert!(!err.is_persistence_fault());
    }
}
