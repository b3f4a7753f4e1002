//! Bulk ingestion pipeline: decode, route, drain the queue, reconcile.

use super::archive::ArchiveDecoder;
use super::queue::IngestionQueue;
use super::reconcile::ReconciliationPlanner;
use super::router::{EnvelopeRouter, RoutedBatch};
use super::types::{IngestReport, IngestStats};
use crate::config::IngestSettings;
use crate::error::IngestError;
use crate::storage::facade::StorageFacade;

use std::io::Read;
use std::sync::Arc;
use uuid::Uuid;

/// Feeds every file entry of the archive through the router, in archive order.
///
/// Stops at the first archive-level error. Entry-level problems are the router's concern.
pub fn decode_and_route<R: Read>(
    reader: R,
    router: &mut EnvelopeRouter,
) -> Result<usize, IngestError> {
    let mut decoder = ArchiveDecoder::new(reader);
    let mut routed = 0usize;

    for entry in decoder.entries()? {
        let mut entry = entry?;
        let body = entry.read_body()?;
        router.route(entry.path(), &body);
        routed += 1;
    }

    Ok(routed)
}

/// Ingests one gzip-compressed tar archive and returns the batch report.
///
/// Store and index failures only show up in `failed`. A malformed archive or a
/// reconciliation failure is returned as an error.
pub async fn ingest_archive<R>(
    storage: Arc<dyn StorageFacade>,
    reader: R,
    settings: IngestSettings,
) -> Result<IngestReport, IngestError>
where
    R: Read + Send + 'static,
{
    let batch_id = Uuid::new_v4();
    tracing::info!("Batch {} started with {} workers", batch_id, settings.workers);

    let stats = Arc::new(IngestStats::default());
    let queue = IngestionQueue::start(storage.clone(), settings.workers, stats.clone());
    let router = EnvelopeRouter::new(queue.submitter(), stats);

    // Decompression and tar parsing are blocking reads.
    let decoded = tokio::task::spawn_blocking(move || {
        let mut router = router;
        let routed = decode_and_route(reader, &mut router);
        (routed, router.finish())
    })
    .await
    .map_err(|e| IngestError::Internal(format!("archive decoder task failed: {}", e)))?;

    let (routed, RoutedBatch { keep, content_id_base }) = decoded;
    let entries = match routed {
        Ok(entries) => entries,
        Err(e) => {
            // Tasks already submitted still drain in the background.
            tracing::error!("Batch {} aborted: {}", batch_id, e);
            return Err(e);
        }
    };

    let (accepted, failed) = queue.finish().await;
    tracing::info!(
        "Batch {} settled: {} entries, {} accepted, {} failed",
        batch_id,
        entries,
        accepted,
        failed
    );

    let deleted = match content_id_base {
        Some(base) => {
            let planner = ReconciliationPlanner::new(storage, settings.page_size);
            match planner.reconcile(&base, &keep).await {
                Ok(deleted) => deleted,
                Err(e) => {
                    tracing::error!("Batch {} reconciliation failed: {}", batch_id, e);
                    return Err(IngestError::Reconciliation(e));
                }
            }
        }
        None => {
            tracing::info!("Batch {} has no contentIDBase; skipping reconciliation", batch_id);
            0
        }
    };

    Ok(IngestReport {
        accepted,
        failed,
        deleted,
    })
}
