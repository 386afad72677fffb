// ABOUTME: File-backed record store, one pretty-printed JSON file per collection
// ABOUTME: Ensures the data directory and collection files exist before use

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::backend::RecordBackend;
use crate::{CollectionFile, StorageError, StorageResult};

/// Stores each collection as `<dir>/<collection>.json`.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir.join(format!("{}.json", collection))
    }

    /// Ensures the data directory and the collection file exist
    async fn ensure_collection_file(&self, collection: &str) -> StorageResult<()> {
        if !self.dir.exists() {
            debug!("Creating Stagegate data directory: {:?}", self.dir);
            fs::create_dir_all(&self.dir).await?;
        }

        let path = self.collection_path(collection);
        if !path.exists() {
            debug!("Creating collection file: {:?}", path);
            let default_file = CollectionFile::default();
            let json_content = serde_json::to_string_pretty(&default_file)?;
            fs::write(&path, json_content).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl RecordBackend for FileBackend {
    async fn initialize(&self) -> StorageResult<()> {
        if !self.dir.exists() {
            debug!("Creating Stagegate data directory: {:?}", self.dir);
            fs::create_dir_all(&self.dir).await?;
        }
        Ok(())
    }

    async fn read_collection(&self, collection: &str) -> StorageResult<Vec<serde_json::Value>> {
        let path = self.collection_path(collection);
        if !path.exists() {
            debug!("Collection {} has no file yet, reading as empty", collection);
            return Ok(Vec::new());
        }

        debug!("Reading collection from: {:?}", path);
        let content = fs::read_to_string(&path).await?;
        let file: CollectionFile = serde_json::from_str(&content)
            .map_err(|_| StorageError::InvalidFormat(collection.to_string()))?;

        debug!(
            "Loaded {} records from collection {}",
            file.records.len(),
            collection
        );
        Ok(file.records)
    }

    async fn write_collection(
        &self,
        collection: &str,
        records: &[serde_json::Value],
    ) -> StorageResult<()> {
        self.ensure_collection_file(collection).await?;

        let path = self.collection_path(collection);
        debug!("Writing {} records to: {:?}", records.len(), path);

        let file = CollectionFile {
            version: stagegate_core::STORE_VERSION.to_string(),
            records: records.to_vec(),
        };
        let json_content = serde_json::to_string_pretty(&file)?;
        fs::write(&path, json_content).await?;

        Ok(())
    }

    async fn list_collections(&self) -> StorageResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Checks if a path exists
pub async fn path_exists(path: impl AsRef<Path>) -> bool {
    fs::metadata(path).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_collection_reads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(tmp.path().join("store"));
        backend.initialize().await.unwrap();

        let records = backend.read_collection("submissions").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(tmp.path().join("store"));
        backend.initialize().await.unwrap();

        let records = vec![json!({"id": "a1", "title": "Depot"})];
        backend
            .write_collection("submissions", &records)
            .await
            .unwrap();

        let loaded = backend.read_collection("submissions").await.unwrap();
        assert_eq!(loaded, records);

        let collections = backend.list_collections().await.unwrap();
        assert_eq!(collections, vec!["submissions".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_invalid_format_not_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("store");
        let backend = FileBackend::new(dir.clone());
        backend.initialize().await.unwrap();

        fs::write(dir.join("submissions.json"), "not json at all")
            .await
            .unwrap();

        let err = backend.read_collection("submissions").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidFormat(_)));
    }
}
