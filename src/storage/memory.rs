//! In-memory backends.
//!
//! DashMap-backed document and blob stores. Documents are kept per collection in a
//! `BTreeMap` so prefix listing can walk ids in order and resume after a marker.

use super::backend::{BlobStore, DocumentStore};
use super::types::ListPage;
use crate::error::{StorageError, StorageResult};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Bound;

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, BTreeMap<String, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, collection: &str, id: &str, doc: Value) -> StorageResult<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Value>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<()> {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|mut docs| docs.remove(id));

        match removed {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(format!("{}/{}", collection, id))),
        }
    }

    async fn delete_many(&self, collection: &str, ids: &[String]) -> StorageResult<()> {
        if let Some(mut docs) = self.collections.get_mut(collection) {
            for id in ids {
                docs.remove(id);
            }
        }
        Ok(())
    }

    async fn list(
        &self,
        collection: &str,
        prefix: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> StorageResult<ListPage> {
        let Some(docs) = self.collections.get(collection) else {
            return Ok(ListPage::default());
        };

        let start = match marker {
            Some(marker) if marker >= prefix => Bound::Excluded(marker),
            _ => Bound::Included(prefix),
        };

        let ids: Vec<String> = docs
            .range::<str, _>((start, Bound::Unbounded))
            .map(|(id, _)| id)
            .take_while(|id| id.starts_with(prefix))
            .take(limit)
            .cloned()
            .collect();

        Ok(ListPage::from_ids(ids))
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
        self.blobs.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        match self.blobs.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(key.to_string())),
        }
    }
}
