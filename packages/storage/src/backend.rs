// ABOUTME: Backend trait every persistence provider must implement
// ABOUTME: Whole-collection read/write over named JSON collections

use async_trait::async_trait;

use crate::StorageResult;

/// A durable key-value JSON record store. Every mutation is
/// read-modify-write against the full collection; there is no row-level
/// locking, and concurrent writers are last-write-wins at the collection
/// level.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Prepare the backing medium (create directories, seed empty files).
    async fn initialize(&self) -> StorageResult<()>;

    /// Read every record in a collection. A collection that was never
    /// written reads as empty, not as an error.
    async fn read_collection(&self, collection: &str) -> StorageResult<Vec<serde_json::Value>>;

    /// Replace a collection's contents.
    async fn write_collection(
        &self,
        collection: &str,
        records: &[serde_json::Value],
    ) -> StorageResult<()>;

    /// Names of collections that currently hold data.
    async fn list_collections(&self) -> StorageResult<Vec<String>>;
}
