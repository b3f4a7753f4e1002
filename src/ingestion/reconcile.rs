//! Reconciliation Planner
//!
//! After a batch settles, removes previously stored content under the batch's
//! `contentIDBase` that the batch neither uploaded nor listed in its keep manifest.
//! Deletion hits the document store and the active index concurrently. Errors here
//! fail the batch report but never undo ingestion.

use super::types::KeepSet;
use crate::error::StorageResult;
use crate::storage::facade::StorageFacade;
use crate::storage::pager::PrefixPager;

use std::sync::Arc;

pub struct ReconciliationPlanner {
    storage: Arc<dyn StorageFacade>,
    page_size: usize,
}

impl ReconciliationPlanner {
    pub fn new(storage: Arc<dyn StorageFacade>, page_size: usize) -> Self {
        Self {
            storage,
            page_size: page_size.max(1),
        }
    }

    /// Stored ids under `base` that are not in `keep`, in listing order.
    pub async fn plan(&self, base: &str, keep: &KeepSet) -> StorageResult<Vec<String>> {
        let mut pager = PrefixPager::new(self.storage.as_ref(), base, self.page_size);
        let mut existing = 0usize;
        let mut to_delete = Vec::new();

        while let Some(ids) = pager.next_page().await? {
            existing += ids.len();
            to_delete.extend(ids.into_iter().filter(|id| !keep.contains(id)));
        }

        tracing::info!(
            "Reconciliation under {:?}: {} stored, {} kept, {} to delete ({} pages)",
            base,
            existing,
            existing - to_delete.len(),
            to_delete.len(),
            pager.pages_fetched()
        );
        Ok(to_delete)
    }

    /// Plans and applies deletions. Returns the number of ids deleted.
    pub async fn reconcile(&self, base: &str, keep: &KeepSet) -> StorageResult<usize> {
        let to_delete = self.plan(base, keep).await?;
        self.delete(&to_delete).await?;
        Ok(to_delete.len())
    }

    async fn delete(&self, ids: &[String]) -> StorageResult<()> {
        match ids {
            [] => Ok(()),
            [id] => {
                let (deleted, unindexed) = tokio::join!(
                    self.storage.delete_envelope(id),
                    self.storage.unindex_envelope(id)
                );
                deleted.and(unindexed)
            }
            ids => {
                let (deleted, unindexed) = tokio::join!(
                    self.storage.delete_envelopes(ids),
                    self.storage.unindex_envelopes(ids)
                );
                deleted.and(unindexed)
            }
        }
    }
}
