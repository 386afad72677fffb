// ABOUTME: In-memory record backend for tests and ephemeral deployments
// ABOUTME: Collections held in an RwLock'd map, same semantics as the file backend

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::backend::RecordBackend;
use crate::StorageResult;

#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, Vec<serde_json::Value>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    async fn initialize(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn read_collection(&self, collection: &str) -> StorageResult<Vec<serde_json::Value>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn write_collection(
        &self,
        collection: &str,
        records: &[serde_json::Value],
    ) -> StorageResult<()> {
        let mut collections = self.collections.write().await;
        collections.insert(collection.to_string(), records.to_vec());
        Ok(())
    }

    async fn list_collections(&self) -> StorageResult<Vec<String>> {
        let collections = self.collections.read().await;
        let mut names: Vec<String> = collections.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
