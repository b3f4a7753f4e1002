use crate::error::StorageResult;
use crate::storage::facade::StorageFacade;
use crate::storage::pager::PrefixPager;

/// Copies every stored envelope into `generation`. Returns the number indexed.
///
/// Used as the population step of a rotation, before the generation is promoted.
pub async fn reindex_from_documents(
    storage: &dyn StorageFacade,
    generation: &str,
    page_size: usize,
) -> StorageResult<usize> {
    let mut pager = PrefixPager::new(storage, "", page_size);
    let mut indexed = 0usize;

    while let Some(ids) = pager.next_page().await? {
        for id in ids {
            match storage.get_envelope(&id).await? {
                Some(envelope) => {
                    storage.index_envelope_into(generation, &envelope).await?;
                    indexed += 1;
                }
                // Removed between listing and fetch.
                None => tracing::debug!("Skipping {} during reindex: gone", id),
            }
        }
    }

    tracing::info!("Reindexed {} envelopes into {}", indexed, generation);
    Ok(indexed)
}
