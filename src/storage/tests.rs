//! Storage Module Tests
//!
//! Validates the backend implementations and the facade composed on top of them.
//!
//! ## Test Scopes
//! - **Memory backends**: ordered prefix listing, marker resumption, delete semantics.
//! - **Filesystem backends**: persistence of documents and blobs under a temp directory.
//! - **Facade**: envelope round trips, idempotent deletes, API keys and control state.
//! - **Pager**: page counting and termination on short pages.
//!
//! *Note: the Elasticsearch engine needs a live cluster and is not covered here.*

#[cfg(test)]
mod tests {
    use crate::index::lifecycle::IndexLifecycleManager;
    use crate::storage::backend::{BlobStore, DocumentStore};
    use crate::storage::facade::{ComposedStorage, StorageFacade};
    use crate::storage::fs::{FsBlobStore, FsDocumentStore};
    use crate::storage::memory::{MemoryBlobStore, MemoryDocumentStore};
    use crate::storage::pager::PrefixPager;
    use crate::storage::types::*;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn envelope(id: &str, payload: Value) -> ContentEnvelope {
        ContentEnvelope::new(id, payload.as_object().cloned().unwrap_or_default())
    }

    async fn seed(store: &dyn DocumentStore, ids: &[&str]) {
        for id in ids {
            store
                .put(CONTENT_COLLECTION, id, json!({ "contentID": id }))
                .await
                .unwrap();
        }
    }

    // ============================================================
    // CONTENT ENVELOPE
    // ============================================================

    #[test]
    fn test_envelope_serializes_flat() {
        let env = envelope("news/1", json!({ "title": "Hello", "contentID": "ignored" }));

        let value = serde_json::to_value(&env).unwrap();

        assert_eq!(value["contentID"], "news/1");
        assert_eq!(value["title"], "Hello");
        assert_eq!(value, env.to_value());

        let back: ContentEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(back, env);
    }

    // ============================================================
    // MEMORY DOCUMENT STORE
    // ============================================================

    #[tokio::test]
    async fn test_memory_list_is_ordered_and_prefix_scoped() {
        let store = MemoryDocumentStore::new();
        seed(&store, &["b/2", "a/1", "b/1", "c/1", "b/3"]).await;

        let page = store.list(CONTENT_COLLECTION, "b/", None, 10).await.unwrap();

        assert_eq!(page.ids, vec!["b/1", "b/2", "b/3"]);
        assert_eq!(page.marker.as_deref(), Some("b/3"));
    }

    #[tokio::test]
    async fn test_memory_list_resumes_after_marker() {
        let store = MemoryDocumentStore::new();
        seed(&store, &["x/1", "x/2", "x/3", "x/4", "y/1"]).await;

        let first = store.list(CONTENT_COLLECTION, "x/", None, 2).await.unwrap();
        let second = store
            .list(CONTENT_COLLECTION, "x/", first.marker.as_deref(), 2)
            .await
            .unwrap();
        let third = store
            .list(CONTENT_COLLECTION, "x/", second.marker.as_deref(), 2)
            .await
            .unwrap();

        assert_eq!(first.ids, vec!["x/1", "x/2"]);
        assert_eq!(second.ids, vec!["x/3", "x/4"]);
        assert!(third.ids.is_empty());
        assert_eq!(third.marker, None);
    }

    #[tokio::test]
    async fn test_memory_delete_reports_missing() {
        let store = MemoryDocumentStore::new();
        seed(&store, &["a", "b"]).await;

        assert!(store.delete(CONTENT_COLLECTION, "a").await.is_ok());
        assert!(store.delete(CONTENT_COLLECTION, "a").await.unwrap_err().is_not_found());

        // Bulk deletes skip ids that are already gone.
        store
            .delete_many(CONTENT_COLLECTION, &["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(store.len(CONTENT_COLLECTION), 0);
    }

    #[tokio::test]
    async fn test_memory_blob_store() {
        let blobs = MemoryBlobStore::new();

        blobs.put("img/logo.png", vec![1, 2, 3]).await.unwrap();

        assert_eq!(blobs.get("img/logo.png").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(blobs.get("missing").await.unwrap(), None);
        assert!(blobs.delete("missing").await.unwrap_err().is_not_found());
    }

    // ============================================================
    // FILESYSTEM STORES
    // ============================================================

    #[tokio::test]
    async fn test_fs_document_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());

        store
            .put(CONTENT_COLLECTION, "news/a b", json!({ "title": "spaces" }))
            .await
            .unwrap();

        let doc = store.get(CONTENT_COLLECTION, "news/a b").await.unwrap();
        assert_eq!(doc, Some(json!({ "title": "spaces" })));
        assert_eq!(store.get(CONTENT_COLLECTION, "news/zz").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fs_list_matches_memory_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        seed(&store, &["x/3", "x/1", "y/1", "x/2"]).await;

        let first = store.list(CONTENT_COLLECTION, "x/", None, 2).await.unwrap();
        let second = store
            .list(CONTENT_COLLECTION, "x/", first.marker.as_deref(), 2)
            .await
            .unwrap();

        assert_eq!(first.ids, vec!["x/1", "x/2"]);
        assert_eq!(second.ids, vec!["x/3"]);

        // Listing a collection that was never written is an empty page.
        let empty = store.list("nothing", "", None, 10).await.unwrap();
        assert!(empty.ids.is_empty());
    }

    #[tokio::test]
    async fn test_fs_delete_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDocumentStore::new(dir.path());
        seed(&store, &["a"]).await;

        store.delete(CONTENT_COLLECTION, "a").await.unwrap();
        assert!(store.delete(CONTENT_COLLECTION, "a").await.unwrap_err().is_not_found());
        store
            .delete_many(CONTENT_COLLECTION, &["a".to_string()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fs_blob_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        FsBlobStore::new(dir.path())
            .put("docs/readme.txt", b"hello".to_vec())
            .await
            .unwrap();

        let reopened = FsBlobStore::new(dir.path());
        assert_eq!(
            reopened.get("docs/readme.txt").await.unwrap(),
            Some(b"hello".to_vec())
        );
    }

    // ============================================================
    // FACADE
    // ============================================================

    #[tokio::test]
    async fn test_facade_envelope_round_trip() {
        let storage = ComposedStorage::in_memory();
        let env = envelope("news/1", json!({ "title": "Rust" }));

        storage.store_envelope(&env).await.unwrap();

        assert_eq!(storage.get_envelope("news/1").await.unwrap(), Some(env));
        assert_eq!(storage.get_envelope("news/2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_facade_index_requires_active_generation() {
        let storage: Arc<dyn StorageFacade> = Arc::new(ComposedStorage::in_memory());
        let env = envelope("news/1", json!({ "title": "Rust" }));

        // No generation holds the alias yet.
        assert!(storage.index_envelope(&env).await.is_err());

        IndexLifecycleManager::new(storage.clone())
            .ensure_active()
            .await
            .unwrap();
        storage.index_envelope(&env).await.unwrap();

        let hits = storage
            .search(&SearchQuery {
                text: "rust".to_string(),
                category: None,
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.hits[0].content_id, "news/1");
    }

    #[tokio::test]
    async fn test_facade_deletes_are_idempotent() {
        let storage = ComposedStorage::in_memory();

        assert!(storage.delete_envelope("never-stored").await.is_ok());
        assert!(storage.unindex_envelope("never-indexed").await.is_ok());
        assert!(
            storage
                .delete_envelopes(&["a".to_string(), "b".to_string()])
                .await
                .is_ok()
        );
        assert!(storage.delete_api_key("nope").await.is_ok());
    }

    #[tokio::test]
    async fn test_facade_api_keys() {
        let storage = ComposedStorage::in_memory();
        let key = ApiKey {
            key: "k-123".to_string(),
            owner: "ops".to_string(),
            created_at: now_ms(),
        };

        storage.store_api_key(&key).await.unwrap();
        assert_eq!(storage.find_api_key("k-123").await.unwrap(), Some(key));

        storage.delete_api_key("k-123").await.unwrap();
        assert_eq!(storage.find_api_key("k-123").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_facade_control_state_and_blobs() {
        let storage = ComposedStorage::in_memory();

        storage.set_control("flag", json!({ "on": true })).await.unwrap();
        storage.store_blob("a.bin", vec![9, 9]).await.unwrap();

        assert_eq!(
            storage.get_control("flag").await.unwrap(),
            Some(json!({ "on": true }))
        );
        assert_eq!(storage.get_control("other").await.unwrap(), None);
        assert_eq!(storage.retrieve_blob("a.bin").await.unwrap(), Some(vec![9, 9]));
    }

    #[tokio::test]
    async fn test_control_state_does_not_leak_into_content_listing() {
        let storage = ComposedStorage::in_memory();
        storage.set_control("x/config", json!(1)).await.unwrap();
        storage.store_envelope(&envelope("x/1", json!({}))).await.unwrap();

        let page = storage.list_by_prefix("x/", None, 10).await.unwrap();

        assert_eq!(page.ids, vec!["x/1"]);
    }

    // ============================================================
    // PAGER
    // ============================================================

    #[tokio::test]
    async fn test_pager_full_last_page_needs_extra_fetch() {
        let storage = ComposedStorage::in_memory();
        for i in 0..4 {
            storage
                .store_envelope(&envelope(&format!("p/{}", i), json!({})))
                .await
                .unwrap();
        }

        let mut pager = PrefixPager::new(&storage, "p/", 4);
        let mut pages = Vec::new();
        while let Some(ids) = pager.next_page().await.unwrap() {
            pages.push(ids);
        }

        // A full page cannot signal the end; the empty second page does.
        assert_eq!(pager.pages_fetched(), 2);
        assert_eq!(pages[0].len(), 4);
        assert!(pages[1].is_empty());
    }

    #[tokio::test]
    async fn test_pager_empty_prefix_yields_one_empty_page() {
        let storage = ComposedStorage::in_memory();
        let mut pager = PrefixPager::new(&storage, "none/", 10);

        assert_eq!(pager.next_page().await.unwrap(), Some(vec![]));
        assert_eq!(pager.next_page().await.unwrap(), None);
        assert_eq!(pager.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_pager_walks_multiple_pages() {
        let storage = ComposedStorage::in_memory();
        for i in 0..7 {
            storage
                .store_envelope(&envelope(&format!("q/{}", i), json!({})))
                .await
                .unwrap();
        }

        let mut pager = PrefixPager::new(&storage, "q/", 3);
        let mut all = Vec::new();
        while let Some(ids) = pager.next_page().await.unwrap() {
            all.extend(ids);
        }

        assert_eq!(all.len(), 7);
        assert_eq!(pager.pages_fetched(), 3);
    }
}
