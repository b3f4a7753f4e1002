//! Filesystem backends.
//!
//! Documents are stored one JSON file per id under `<root>/<collection>/`, blobs one file
//! per key under `<root>/`. File names are the percent-encoded id, so any id (including
//! ones containing `/`) maps to a single flat file. Writes go through a temporary file
//! and a rename so readers never observe a half-written document.

use super::backend::{BlobStore, DocumentStore};
use super::types::ListPage;
use crate::error::{StorageError, StorageResult};

use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const DOC_EXTENSION: &str = ".json";

fn encode_name(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

fn decode_name(name: &str) -> Option<String> {
    urlencoding::decode(name).ok().map(|id| id.into_owned())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StorageError::backend(format!("no parent for {}", path.display())))?;
    tokio::fs::create_dir_all(dir).await?;

    let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_optional(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn remove(path: &Path, what: &str) -> StorageResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(what.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn doc_path(&self, collection: &str, id: &str) -> PathBuf {
        self.root
            .join(collection)
            .join(format!("{}{}", encode_name(id), DOC_EXTENSION))
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn put(&self, collection: &str, id: &str, doc: Value) -> StorageResult<()> {
        let bytes = serde_json::to_vec(&doc)?;
        write_atomic(&self.doc_path(collection, id), &bytes).await
    }

    async fn get(&self, collection: &str, id: &str) -> StorageResult<Option<Value>> {
        match read_optional(&self.doc_path(collection, id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> StorageResult<()> {
        remove(
            &self.doc_path(collection, id),
            &format!("{}/{}", collection, id),
        )
        .await
    }

    async fn delete_many(&self, collection: &str, ids: &[String]) -> StorageResult<()> {
        for id in ids {
            match self.delete(collection, id).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
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
        let dir = self.root.join(collection);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ListPage::default()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let Some(stem) = name.strip_suffix(DOC_EXTENSION) else {
                continue;
            };
            let Some(id) = decode_name(stem) else {
                tracing::warn!("Skipping undecodable document file {}", name);
                continue;
            };
            if id.starts_with(prefix) && marker.is_none_or(|m| id.as_str() > m) {
                ids.push(id);
            }
        }

        ids.sort();
        ids.truncate(limit);
        Ok(ListPage::from_ids(ids))
    }
}

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(encode_name(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
        write_atomic(&self.blob_path(key), &bytes).await
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        read_optional(&self.blob_path(key)).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        remove(&self.blob_path(key), key).await
    }
}
