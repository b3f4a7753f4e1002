//! Index Rotation
//!
//! Builds a new search index generation and promotes it to active without downtime.
//!
//! ## Protocol
//! 1. **Latch**: create the fixed-name latch index. `AlreadyExists` means another
//!    rotation is in flight, and this call returns `AlreadyRunning` having done nothing.
//!    Mutual exclusion comes entirely from the backend's create-if-absent semantics.
//! 2. **Create**: create `<prefix>_<epoch-millis>` with the content field mapping, then
//!    run the caller's population step against it.
//! 3. **Promote**: one atomic alias update removes the active alias from every current
//!    holder and adds it to the new generation.
//! 4. **Collect**: delete every other prefixed index, the latch included.
//!
//! Writers that index content between another process's latch creation and its alias
//! swap land in the old generation only; such content is missing from the new
//! generation until the next rotation.

use super::{ACTIVE_ALIAS, ACTIVE_GENERATION_KEY, INDEX_PREFIX, LATCH_NAME};
use crate::error::{StorageError, StorageResult, ignore_not_found};
use crate::storage::facade::StorageFacade;
use crate::storage::types::{AliasAction, IndexGeneration, IndexMapping, now_ms};

use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// Consecutive millisecond suffixes tried before generation creation gives up.
const GENERATION_NAME_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RotationOutcome {
    Rotated {
        generation: IndexGeneration,
        retired: Vec<String>,
    },
    AlreadyRunning,
}

pub struct IndexLifecycleManager {
    storage: Arc<dyn StorageFacade>,
    prefix: String,
    alias: String,
    latch: String,
}

impl IndexLifecycleManager {
    pub fn new(storage: Arc<dyn StorageFacade>) -> Self {
        Self {
            storage,
            prefix: INDEX_PREFIX.to_string(),
            alias: ACTIVE_ALIAS.to_string(),
            latch: LATCH_NAME.to_string(),
        }
    }

    /// Rotates with no population step; the new generation starts empty.
    pub async fn rotate(&self) -> StorageResult<RotationOutcome> {
        self.rotate_with(|_generation| async { Ok(()) }).await
    }

    /// Runs the full rotation protocol. `populate` receives the new generation's name and
    /// runs after the generation is created and before it is promoted.
    pub async fn rotate_with<F, Fut>(&self, populate: F) -> StorageResult<RotationOutcome>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = StorageResult<()>>,
    {
        match self
            .storage
            .create_index(&self.latch, &IndexMapping::empty())
            .await
        {
            Ok(()) => tracing::info!("Acquired index rebuild latch {}", self.latch),
            Err(e) if e.is_already_exists() => {
                tracing::info!("Index rebuild already in progress, skipping");
                return Ok(RotationOutcome::AlreadyRunning);
            }
            Err(e) => return Err(e),
        }

        let generation = match self.create_generation().await {
            Ok(generation) => generation,
            Err(e) => {
                tracing::error!("Failed to create index generation: {}", e);
                self.abandon(None).await;
                return Err(e);
            }
        };
        tracing::info!("Created index generation {}", generation.name);

        let prepared = match populate(generation.name.clone()).await {
            Ok(()) => self.promote(&generation.name).await,
            Err(e) => Err(e),
        };
        if let Err(e) = prepared {
            tracing::error!("Rotation to {} aborted: {}", generation.name, e);
            self.abandon(Some(&generation.name)).await;
            return Err(e);
        }

        if let Err(e) = self
            .storage
            .set_control(ACTIVE_GENERATION_KEY, serde_json::to_value(&generation)?)
            .await
        {
            tracing::warn!("Failed to record active generation: {}", e);
        }

        let retired = match self.collect_garbage(&generation.name).await {
            Ok(retired) => retired,
            Err(e) => {
                tracing::error!("Failed to retire old generations: {}", e);
                self.abandon(None).await;
                return Err(e);
            }
        };

        tracing::info!(
            "Promoted {} to {}, retired {} indices",
            generation.name,
            self.alias,
            retired.len()
        );
        Ok(RotationOutcome::Rotated {
            generation,
            retired,
        })
    }

    /// Rotates only when no generation currently holds the active alias.
    pub async fn ensure_active(&self) -> StorageResult<Option<RotationOutcome>> {
        if !self.storage.indices_for_alias(&self.alias).await?.is_empty() {
            return Ok(None);
        }
        tracing::info!("No active index generation, bootstrapping one");
        self.rotate().await.map(Some)
    }

    pub async fn active_generation(&self) -> StorageResult<Option<IndexGeneration>> {
        match self.storage.get_control(ACTIVE_GENERATION_KEY).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub async fn aliased_indices(&self) -> StorageResult<Vec<String>> {
        self.storage.indices_for_alias(&self.alias).await
    }

    /// Creates `<prefix>_<millis>`. A name taken by a rotation in the same millisecond
    /// moves on to the next millisecond.
    async fn create_generation(&self) -> StorageResult<IndexGeneration> {
        let mut created_at = now_ms();

        for _ in 0..GENERATION_NAME_ATTEMPTS {
            let name = format!("{}_{}", self.prefix, created_at);
            match self
                .storage
                .create_index(&name, &IndexMapping::content())
                .await
            {
                Ok(()) => return Ok(IndexGeneration { name, created_at }),
                Err(e) if e.is_already_exists() => {
                    tracing::debug!("Generation name {} taken, trying the next", name);
                    created_at += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Err(StorageError::AlreadyExists(format!(
            "{}_{}: no free generation name",
            self.prefix, created_at
        )))
    }

    /// Moves the alias onto `generation` in a single atomic update.
    async fn promote(&self, generation: &str) -> StorageResult<()> {
        let holders = self.storage.indices_for_alias(&self.alias).await?;

        let mut actions: Vec<AliasAction> = holders
            .into_iter()
            .map(|index| AliasAction::Remove {
                index,
                alias: self.alias.clone(),
            })
            .collect();
        actions.push(AliasAction::Add {
            index: generation.to_string(),
            alias: self.alias.clone(),
        });

        self.storage.update_aliases(&actions).await
    }

    /// Deletes every prefixed index except `keep`, then releases the latch.
    async fn collect_garbage(&self, keep: &str) -> StorageResult<Vec<String>> {
        let family = format!("{}_", self.prefix);
        let mut retired = Vec::new();

        for index in self.storage.list_indices().await? {
            if index.name == keep || !index.name.starts_with(&family) {
                continue;
            }
            ignore_not_found(self.storage.delete_index(&index.name).await)?;
            if index.name != self.latch {
                retired.push(index.name);
            }
        }

        ignore_not_found(self.storage.delete_index(&self.latch).await)?;
        Ok(retired)
    }

    /// Best-effort cleanup after a failed rotation: drops the unpromoted generation and
    /// releases the latch so later rotations are not blocked.
    async fn abandon(&self, generation: Option<&str>) {
        if let Some(name) = generation {
            // A promote whose response was lost may still have moved the alias.
            let promoted = self
                .aliased_indices()
                .await
                .map(|holders| holders.iter().any(|h| h == name))
                .unwrap_or(true);
            if promoted {
                tracing::warn!("Keeping generation {}: it holds the active alias", name);
            } else if let Err(e) = ignore_not_found(self.storage.delete_index(name).await) {
                tracing::warn!("Failed to delete abandoned generation {}: {}", name, e);
            }
        }
        if let Err(e) = ignore_not_found(self.storage.delete_index(&self.latch).await) {
            tracing::warn!("Failed to release rebuild latch {}: {}", self.latch, e);
        }
    }
}
