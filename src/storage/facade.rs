//! Storage Facade
//!
//! `StorageFacade` is the single capability interface the ingestion pipeline, the
//! reconciliation planner and the index lifecycle depend on. `ComposedStorage`
//! implements it on top of a `DocumentStore`, a `BlobStore` and a `SearchEngine`.
//!
//! ## Realizations
//! - **Local**: `ComposedStorage::in_memory()` wires the DashMap-backed stores and the
//!   in-memory search engine. Used by tests and single-node runs.
//! - **Distributed**: `ComposedStorage::new(..)` with filesystem stores and an
//!   Elasticsearch-compatible engine (see `main.rs`).

use super::backend::{BlobStore, DocumentStore, SearchEngine};
use super::memory::{MemoryBlobStore, MemoryDocumentStore};
use super::types::*;
use crate::error::{StorageError, StorageResult, ignore_not_found};
use crate::index::ACTIVE_ALIAS;
use crate::search::memory::MemorySearchEngine;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait StorageFacade: Send + Sync {
    // --- Content ---

    /// Persists an envelope in the document store (overwrite semantics).
    async fn store_envelope(&self, envelope: &ContentEnvelope) -> StorageResult<()>;

    async fn get_envelope(&self, content_id: &str) -> StorageResult<Option<ContentEnvelope>>;

    /// Indexes an envelope into the active generation.
    async fn index_envelope(&self, envelope: &ContentEnvelope) -> StorageResult<()>;

    /// Indexes an envelope into a specific generation, bypassing the alias.
    async fn index_envelope_into(
        &self,
        generation: &str,
        envelope: &ContentEnvelope,
    ) -> StorageResult<()>;

    /// Removes an envelope from the document store. Missing ids are not an error.
    async fn delete_envelope(&self, content_id: &str) -> StorageResult<()>;

    async fn delete_envelopes(&self, content_ids: &[String]) -> StorageResult<()>;

    /// Removes an envelope from the active generation. Missing ids are not an error.
    async fn unindex_envelope(&self, content_id: &str) -> StorageResult<()>;

    async fn unindex_envelopes(&self, content_ids: &[String]) -> StorageResult<()>;

    /// One page of stored content ids starting with `prefix`.
    async fn list_by_prefix(
        &self,
        prefix: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> StorageResult<ListPage>;

    async fn search(&self, query: &SearchQuery) -> StorageResult<SearchHits>;

    // --- Index administration ---

    async fn create_index(&self, name: &str, mapping: &IndexMapping) -> StorageResult<()>;

    async fn list_indices(&self) -> StorageResult<Vec<IndexGeneration>>;

    async fn indices_for_alias(&self, alias: &str) -> StorageResult<Vec<String>>;

    async fn update_aliases(&self, actions: &[AliasAction]) -> StorageResult<()>;

    async fn delete_index(&self, name: &str) -> StorageResult<()>;

    // --- Blobs ---

    async fn store_blob(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()>;

    async fn retrieve_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    // --- API keys ---

    async fn store_api_key(&self, api_key: &ApiKey) -> StorageResult<()>;

    async fn delete_api_key(&self, key: &str) -> StorageResult<()>;

    async fn find_api_key(&self, key: &str) -> StorageResult<Option<ApiKey>>;

    // --- Control state ---

    async fn get_control(&self, name: &str) -> StorageResult<Option<Value>>;

    async fn set_control(&self, name: &str, value: Value) -> StorageResult<()>;
}

pub struct ComposedStorage {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    search: Arc<dyn SearchEngine>,
    active_alias: String,
}

impl ComposedStorage {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        search: Arc<dyn SearchEngine>,
    ) -> Self {
        Self {
            documents,
            blobs,
            search,
            active_alias: ACTIVE_ALIAS.to_string(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryDocumentStore::new()),
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemorySearchEngine::new()),
        )
    }
}

#[async_trait]
impl StorageFacade for ComposedStorage {
    async fn store_envelope(&self, envelope: &ContentEnvelope) -> StorageResult<()> {
        self.documents
            .put(CONTENT_COLLECTION, &envelope.content_id, envelope.to_value())
            .await
    }

    async fn get_envelope(&self, content_id: &str) -> StorageResult<Option<ContentEnvelope>> {
        match self.documents.get(CONTENT_COLLECTION, content_id).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    async fn index_envelope(&self, envelope: &ContentEnvelope) -> StorageResult<()> {
        self.search
            .index_document(&self.active_alias, &envelope.content_id, &envelope.to_value())
            .await
    }

    async fn index_envelope_into(
        &self,
        generation: &str,
        envelope: &ContentEnvelope,
    ) -> StorageResult<()> {
        self.search
            .index_document(generation, &envelope.content_id, &envelope.to_value())
            .await
    }

    async fn delete_envelope(&self, content_id: &str) -> StorageResult<()> {
        ignore_not_found(self.documents.delete(CONTENT_COLLECTION, content_id).await)
    }

    async fn delete_envelopes(&self, content_ids: &[String]) -> StorageResult<()> {
        ignore_not_found(self.documents.delete_many(CONTENT_COLLECTION, content_ids).await)
    }

    async fn unindex_envelope(&self, content_id: &str) -> StorageResult<()> {
        ignore_not_found(
            self.search
                .delete_document(&self.active_alias, content_id)
                .await,
        )
    }

    async fn unindex_envelopes(&self, content_ids: &[String]) -> StorageResult<()> {
        ignore_not_found(self.search.bulk_delete(&self.active_alias, content_ids).await)
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> StorageResult<ListPage> {
        self.documents
            .list(CONTENT_COLLECTION, prefix, marker, limit)
            .await
    }

    async fn search(&self, query: &SearchQuery) -> StorageResult<SearchHits> {
        self.search.search(&self.active_alias, query).await
    }

    async fn create_index(&self, name: &str, mapping: &IndexMapping) -> StorageResult<()> {
        self.search.create_index(name, mapping).await
    }

    async fn list_indices(&self) -> StorageResult<Vec<IndexGeneration>> {
        self.search.list_indices().await
    }

    async fn indices_for_alias(&self, alias: &str) -> StorageResult<Vec<String>> {
        self.search.indices_for_alias(alias).await
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> StorageResult<()> {
        self.search.update_aliases(actions).await
    }

    async fn delete_index(&self, name: &str) -> StorageResult<()> {
        self.search.delete_index(name).await
    }

    async fn store_blob(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
        self.blobs.put(key, bytes).await
    }

    async fn retrieve_blob(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.blobs.get(key).await
    }

    async fn store_api_key(&self, api_key: &ApiKey) -> StorageResult<()> {
        self.documents
            .put(API_KEY_COLLECTION, &api_key.key, serde_json::to_value(api_key)?)
            .await
    }

    async fn delete_api_key(&self, key: &str) -> StorageResult<()> {
        ignore_not_found(self.documents.delete(API_KEY_COLLECTION, key).await)
    }

    async fn find_api_key(&self, key: &str) -> StorageResult<Option<ApiKey>> {
        self.documents
            .get(API_KEY_COLLECTION, key)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StorageError::from)
    }

    async fn get_control(&self, name: &str) -> StorageResult<Option<Value>> {
        self.documents.get(CONTROL_COLLECTION, name).await
    }

    async fn set_control(&self, name: &str, value: Value) -> StorageResult<()> {
        self.documents.put(CONTROL_COLLECTION, name, value).await
    }
}
