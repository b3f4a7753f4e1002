//! Index Lifecycle Tests
//!
//! ## Test Scopes
//! - **Rotation**: latch acquisition, promotion, garbage collection, control state.
//! - **Contention**: concurrent rotation requests against one storage tier.
//! - **Failure**: cleanup after a failed population step.
//! - **Reindex**: populating a new generation from the document store.

#[cfg(test)]
mod tests {
    use crate::error::StorageError;
    use crate::index::lifecycle::{IndexLifecycleManager, RotationOutcome};
    use crate::index::reindex::reindex_from_documents;
    use crate::index::{ACTIVE_ALIAS, LATCH_NAME};
    use crate::storage::facade::{ComposedStorage, StorageFacade};
    use crate::storage::types::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn storage() -> Arc<dyn StorageFacade> {
        Arc::new(ComposedStorage::in_memory())
    }

    fn rotated_name(outcome: &RotationOutcome) -> String {
        match outcome {
            RotationOutcome::Rotated { generation, .. } => generation.name.clone(),
            RotationOutcome::AlreadyRunning => panic!("expected a rotation, got AlreadyRunning"),
        }
    }

    async fn index_names(storage: &Arc<dyn StorageFacade>) -> Vec<String> {
        storage
            .list_indices()
            .await
            .unwrap()
            .into_iter()
            .map(|index| index.name)
            .collect()
    }

    // ============================================================
    // TEST 1: Single rotation
    // ============================================================

    #[tokio::test]
    async fn test_rotation_promotes_new_generation() {
        // ARRANGE
        let storage = storage();
        let manager = IndexLifecycleManager::new(storage.clone());

        // ACT
        let outcome = manager.rotate().await.unwrap();

        // ASSERT: alias points at the new generation, latch is gone
        let name = rotated_name(&outcome);
        assert!(name.starts_with("content_"));
        assert_eq!(storage.indices_for_alias(ACTIVE_ALIAS).await.unwrap(), vec![name.clone()]);
        assert_eq!(index_names(&storage).await, vec![name.clone()]);

        // ASSERT: control state records the promoted generation
        let active = manager.active_generation().await.unwrap().unwrap();
        assert_eq!(active.name, name);
    }

    #[tokio::test]
    async fn test_second_rotation_retires_first_generation() {
        // ARRANGE
        let storage = storage();
        let manager = IndexLifecycleManager::new(storage.clone());
        let first = rotated_name(&manager.rotate().await.unwrap());

        // ACT
        let outcome = manager.rotate().await.unwrap();

        // ASSERT
        match outcome {
            RotationOutcome::Rotated {
                generation,
                retired,
            } => {
                assert_ne!(generation.name, first);
                assert_eq!(retired, vec![first]);
                assert_eq!(index_names(&storage).await, vec![generation.name.clone()]);
                assert_eq!(
                    manager.aliased_indices().await.unwrap(),
                    vec![generation.name]
                );
            }
            RotationOutcome::AlreadyRunning => panic!("latch was not released"),
        }
    }

    #[tokio::test]
    async fn test_back_to_back_rotations_get_distinct_names() {
        // ARRANGE
        let storage = storage();
        let manager = IndexLifecycleManager::new(storage.clone());

        // ACT: no pause between rotations, so several share a millisecond
        let mut names = Vec::new();
        for _ in 0..5 {
            names.push(rotated_name(&manager.rotate().await.unwrap()));
        }

        // ASSERT
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 5);
        assert_eq!(index_names(&storage).await, vec![names[4].clone()]);
    }

    #[tokio::test]
    async fn test_taken_generation_name_moves_to_next_millisecond() {
        // ARRANGE: names for the next few milliseconds already exist
        let storage = storage();
        let start = now_ms();
        let taken: Vec<String> = (start..start + 5)
            .map(|millis| format!("content_{}", millis))
            .collect();
        for name in &taken {
            storage
                .create_index(name, &IndexMapping::content())
                .await
                .unwrap();
        }

        // ACT
        let outcome = IndexLifecycleManager::new(storage.clone())
            .rotate()
            .await
            .unwrap();

        // ASSERT: a fresh name was picked and the pre-existing generations were collected
        let name = rotated_name(&outcome);
        assert!(!taken.contains(&name));
        assert_eq!(index_names(&storage).await, vec![name]);
    }

    #[tokio::test]
    async fn test_gc_leaves_unrelated_indices_alone() {
        let storage = storage();
        storage
            .create_index("audit_log", &IndexMapping::empty())
            .await
            .unwrap();

        IndexLifecycleManager::new(storage.clone())
            .rotate()
            .await
            .unwrap();

        assert!(index_names(&storage).await.contains(&"audit_log".to_string()));
    }

    // ============================================================
    // TEST 2: Latch contention
    // ============================================================

    #[tokio::test]
    async fn test_existing_latch_short_circuits() {
        // ARRANGE: another process holds the latch
        let storage = storage();
        storage
            .create_index(LATCH_NAME, &IndexMapping::empty())
            .await
            .unwrap();

        // ACT
        let outcome = IndexLifecycleManager::new(storage.clone())
            .rotate()
            .await
            .unwrap();

        // ASSERT: nothing was created or promoted
        assert_eq!(outcome, RotationOutcome::AlreadyRunning);
        assert_eq!(index_names(&storage).await, vec![LATCH_NAME.to_string()]);
        assert!(storage.indices_for_alias(ACTIVE_ALIAS).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_rotations_yield_one_winner() {
        // ARRANGE
        let storage = storage();
        IndexLifecycleManager::new(storage.clone())
            .rotate()
            .await
            .unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let observer = {
            let storage = storage.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                let mut max_holders = 0usize;
                while !stop.load(Ordering::SeqCst) {
                    let holders = storage.indices_for_alias(ACTIVE_ALIAS).await.unwrap();
                    max_holders = max_holders.max(holders.len());
                    tokio::task::yield_now().await;
                }
                max_holders
            })
        };

        // ACT: eight requests race; the winner's population step is slow
        let mut handles = Vec::new();
        for _ in 0..8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                IndexLifecycleManager::new(storage)
                    .rotate_with(|_generation| async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(())
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }
        stop.store(true, Ordering::SeqCst);
        let max_holders = observer.await.unwrap();

        // ASSERT
        let winners = outcomes
            .iter()
            .filter(|o| matches!(o, RotationOutcome::Rotated { .. }))
            .count();
        assert_eq!(winners, 1);
        assert_eq!(max_holders, 1, "alias must never have two holders");
        assert_eq!(storage.indices_for_alias(ACTIVE_ALIAS).await.unwrap().len(), 1);
        assert_eq!(index_names(&storage).await.len(), 1);
    }

    // ============================================================
    // TEST 3: Bootstrap
    // ============================================================

    #[tokio::test]
    async fn test_ensure_active_rotates_only_once() {
        let storage = storage();
        let manager = IndexLifecycleManager::new(storage.clone());

        let first = manager.ensure_active().await.unwrap();
        let second = manager.ensure_active().await.unwrap();

        assert!(matches!(first, Some(RotationOutcome::Rotated { .. })));
        assert_eq!(second, None);
        assert_eq!(manager.aliased_indices().await.unwrap().len(), 1);
    }

    // ============================================================
    // TEST 4: Failure cleanup
    // ============================================================

    #[tokio::test]
    async fn test_failed_population_keeps_old_generation_live() {
        // ARRANGE
        let storage = storage();
        let manager = IndexLifecycleManager::new(storage.clone());
        let live = rotated_name(&manager.rotate().await.unwrap());

        // ACT
        let result = manager
            .rotate_with(|_generation| async { Err(StorageError::backend("populate failed")) })
            .await;

        // ASSERT: error surfaced, alias untouched, new generation and latch removed
        assert!(result.is_err());
        assert_eq!(manager.aliased_indices().await.unwrap(), vec![live.clone()]);
        assert_eq!(index_names(&storage).await, vec![live]);

        // ASSERT: the latch was released, so a retry goes through
        assert!(matches!(
            manager.rotate().await.unwrap(),
            RotationOutcome::Rotated { .. }
        ));
    }

    // ============================================================
    // TEST 5: Reindex
    // ============================================================

    #[tokio::test]
    async fn test_rotation_with_reindex_copies_stored_content() {
        // ARRANGE: content stored but never indexed
        let storage = storage();
        for i in 0..5 {
            let payload = json!({ "title": format!("article {}", i), "body": "searchable" });
            let envelope = ContentEnvelope::new(
                format!("news/{}", i),
                payload.as_object().cloned().unwrap(),
            );
            storage.store_envelope(&envelope).await.unwrap();
        }

        // ACT
        let manager = IndexLifecycleManager::new(storage.clone());
        let reindexer = storage.clone();
        let outcome = manager
            .rotate_with(move |generation| async move {
                let indexed = reindex_from_documents(reindexer.as_ref(), &generation, 2).await?;
                assert_eq!(indexed, 5);
                Ok(())
            })
            .await
            .unwrap();

        // ASSERT: the promoted generation serves the copied content
        assert!(matches!(outcome, RotationOutcome::Rotated { .. }));
        let hits = storage
            .search(&SearchQuery {
                text: "searchable".to_string(),
                category: None,
                limit: 10,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(hits.total, 5);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = RotationOutcome::Rotated {
            generation: IndexGeneration {
                name: "content_1".to_string(),
                created_at: 1,
            },
            retired: vec!["content_0".to_string()],
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "rotated");
        assert_eq!(value["generation"]["name"], "content_1");
        assert_eq!(
            serde_json::to_value(RotationOutcome::AlreadyRunning).unwrap(),
            json!({ "status": "already_running" })
        );
    }
}
