//! Backend Capability Traits
//!
//! The three technologies a `ComposedStorage` is assembled from. Each trait has an
//! in-memory implementation (tests, single node) and a distributed one
//! (filesystem-backed stores, Elasticsearch-compatible search engine).

use super::types::{AliasAction, IndexGeneration, IndexMapping, ListPage, SearchHits, SearchQuery};
use crate::error::StorageResult;

use async_trait::async_trait;
use serde_json::Value;

/// Collection-scoped JSON document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts or overwrites a document.
    async fn put(&self, collection: &str, id: &str, doc: Value) -> StorageResult<()>;

    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Value>>;

    /// Fails with `NotFound` when the document does not exist.
    async fn delete(&self, collection: &str, id: &str) -> StorageResult<()>;

    /// Removes every listed document; ids that do not exist are skipped.
    async fn delete_many(&self, collection: &str, ids: &[String]) -> StorageResult<()>;

    /// Returns up to `limit` ids starting with `prefix`, in ascending order,
    /// strictly after `marker` when one is given.
    async fn list(
        &self,
        collection: &str,
        prefix: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> StorageResult<ListPage>;
}

/// Opaque byte object storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()>;

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Fails with `NotFound` when the blob does not exist.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

/// Full-text search engine with named indices and aliases.
///
/// `target` arguments accept either an index name or an alias that resolves to
/// exactly one index.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Creates an index if absent. Fails with `AlreadyExists` otherwise; the check and
    /// the creation are a single atomic step.
    async fn create_index(&self, name: &str, mapping: &IndexMapping) -> StorageResult<()>;

    async fn list_indices(&self) -> StorageResult<Vec<IndexGeneration>>;

    /// Names of the indices currently holding `alias`.
    async fn indices_for_alias(&self, alias: &str) -> StorageResult<Vec<String>>;

    /// Applies all actions as one atomic step: either every action takes effect or none.
    async fn update_aliases(&self, actions: &[AliasAction]) -> StorageResult<()>;

    /// Fails with `NotFound` when the index does not exist.
    async fn delete_index(&self, name: &str) -> StorageResult<()>;

    async fn index_document(&self, target: &str, id: &str, doc: &Value) -> StorageResult<()>;

    /// Fails with `NotFound` when the document or the target does not exist.
    async fn delete_document(&self, target: &str, id: &str) -> StorageResult<()>;

    /// Removes every listed document; ids that do not exist are skipped.
    async fn bulk_delete(&self, target: &str, ids: &[String]) -> StorageResult<()>;

    async fn search(&self, target: &str, query: &SearchQuery) -> StorageResult<SearchHits>;
}
