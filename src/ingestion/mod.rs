//! Bulk Ingestion Module
//!
//! Accepts a gzip-compressed tar archive of JSON content records and makes the stored
//! and indexed content match it.
//!
//! ## Workflow
//! 1. **Decode**: `ArchiveDecoder` streams file entries out of the archive in order.
//! 2. **Route**: `EnvelopeRouter` captures the config and keep manifests and turns every
//!    other `*.json` entry into an `IngestionTask`.
//! 3. **Persist**: `IngestionQueue` stores and indexes tasks under bounded concurrency.
//! 4. **Reconcile**: once the queue has drained, `ReconciliationPlanner` deletes stored
//!    content under `contentIDBase` that the batch did not protect.
//!
//! Partial success is a normal outcome and is reported through `IngestReport`.

pub mod archive;
pub mod handlers;
pub mod pipeline;
pub mod queue;
pub mod reconcile;
pub mod router;
pub mod types;
