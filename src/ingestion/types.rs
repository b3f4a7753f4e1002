//! Ingestion Data Types
//!
//! Queue payloads, batch-wide counters, the keep set and the DTOs returned by the
//! bulk upload endpoint.

use crate::storage::types::ContentEnvelope;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One parsed record waiting to be stored and indexed. Never retried.
#[derive(Debug, Clone)]
pub struct IngestionTask {
    pub content_id: String,
    pub envelope: ContentEnvelope,
}

/// Accepted/failed counters shared by the router and the queue workers of one batch.
#[derive(Debug, Default)]
pub struct IngestStats {
    accepted: AtomicUsize,
    failed: AtomicUsize,
}

impl IngestStats {
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Content ids that reconciliation must not delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeepSet(HashSet<String>);

impl KeepSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, content_id: impl Into<String>) {
        self.0.insert(content_id.into());
    }

    pub fn contains(&self, content_id: &str) -> bool {
        self.0.contains(content_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for KeepSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Final counters of a bulk upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub failed: usize,
    pub deleted: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
