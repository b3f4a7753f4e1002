//! Envelope Router
//!
//! Classifies each archive entry by its path and dispatches it:
//! - `metadata/config.json` captures the reconciliation scope (`contentIDBase`).
//! - `metadata/keep.json` extends the keep set.
//! - any other `*.json` is a content record, submitted to the ingestion queue.
//! - everything else is ignored.
//!
//! Manifest problems are logged and skipped. Record problems count as failures.

use super::queue::TaskSubmitter;
use super::types::{IngestStats, IngestionTask, KeepSet};
use crate::storage::types::ContentEnvelope;

use serde_json::Value;
use std::sync::Arc;

const METADATA_DIR: &str = "metadata";
const CONFIG_FILE: &str = "config.json";
const KEEP_FILE: &str = "keep.json";
const RECORD_EXTENSION: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryClass {
    Config,
    Keep,
    Record { content_id: String },
    /// A `*.json` entry whose file name does not percent-decode to a valid id.
    BadRecordName { name: String },
    Unrecognized,
}

/// Classifies an archive path. Only the parent directory name and the file name matter,
/// so `batch/metadata/config.json` and `metadata/config.json` are both the config manifest.
pub fn classify(path: &str) -> EntryClass {
    let mut segments = path.rsplit('/');
    let file_name = segments.next().unwrap_or_default();
    let parent = segments.next().unwrap_or_default();

    if parent == METADATA_DIR {
        match file_name {
            CONFIG_FILE => return EntryClass::Config,
            KEEP_FILE => return EntryClass::Keep,
            _ => {}
        }
    }

    let Some(stem) = file_name.strip_suffix(RECORD_EXTENSION) else {
        return EntryClass::Unrecognized;
    };
    if stem.is_empty() {
        return EntryClass::Unrecognized;
    }

    match urlencoding::decode(stem) {
        Ok(content_id) => EntryClass::Record {
            content_id: content_id.into_owned(),
        },
        Err(_) => EntryClass::BadRecordName {
            name: file_name.to_string(),
        },
    }
}

/// What the router learned about the batch once the archive is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutedBatch {
    pub keep: KeepSet,
    pub content_id_base: Option<String>,
}

pub struct EnvelopeRouter {
    submitter: TaskSubmitter,
    stats: Arc<IngestStats>,
    keep: KeepSet,
    content_id_base: Option<String>,
}

impl EnvelopeRouter {
    pub fn new(submitter: TaskSubmitter, stats: Arc<IngestStats>) -> Self {
        Self {
            submitter,
            stats,
            keep: KeepSet::new(),
            content_id_base: None,
        }
    }

    /// Dispatches one entry body according to its path.
    pub fn route(&mut self, path: &str, body: &[u8]) {
        match classify(path) {
            EntryClass::Config => self.handle_config(path, body),
            EntryClass::Keep => self.handle_keep(path, body),
            EntryClass::Record { content_id } => self.handle_record(content_id, body),
            EntryClass::BadRecordName { name } => {
                tracing::warn!("Record name {} is not valid percent-encoding", name);
                self.stats.record_failed();
            }
            EntryClass::Unrecognized => {
                tracing::debug!("Ignoring unrecognized archive entry {}", path);
            }
        }
    }

    /// Drops the submitter so the queue can close, and hands back the batch state.
    pub fn finish(self) -> RoutedBatch {
        RoutedBatch {
            keep: self.keep,
            content_id_base: self.content_id_base,
        }
    }

    fn handle_config(&mut self, path: &str, body: &[u8]) {
        let Some(doc) = parse_json(path, body) else {
            return;
        };

        match doc.get("contentIDBase").and_then(Value::as_str) {
            Some(base) => {
                if let Some(previous) = &self.content_id_base {
                    tracing::warn!("Config manifest repeated; replacing base {}", previous);
                }
                tracing::info!("Reconciliation scope set to {:?}", base);
                self.content_id_base = Some(base.to_string());
            }
            None => tracing::warn!("{} has no contentIDBase string; skipping", path),
        }
    }

    fn handle_keep(&mut self, path: &str, body: &[u8]) {
        let Some(doc) = parse_json(path, body) else {
            return;
        };

        let Some(ids) = doc.get("keep").and_then(Value::as_array) else {
            tracing::warn!("{} has no keep array; skipping", path);
            return;
        };

        let mut added = 0usize;
        for id in ids {
            match id.as_str() {
                Some(id) => {
                    self.keep.insert(id);
                    added += 1;
                }
                None => tracing::warn!("Ignoring non-string keep entry {} in {}", id, path),
            }
        }
        tracing::debug!("Keep manifest added {} ids", added);
    }

    fn handle_record(&mut self, content_id: String, body: &[u8]) {
        // Presence in the batch protects the id, whatever happens to its body.
        self.keep.insert(content_id.clone());

        let payload = match std::str::from_utf8(body)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<Value>(text).map_err(|e| e.to_string()))
        {
            Ok(Value::Object(payload)) => payload,
            Ok(other) => {
                tracing::warn!("Record {} is not a JSON object: {}", content_id, kind_of(&other));
                self.stats.record_failed();
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to parse record {}: {}", content_id, e);
                self.stats.record_failed();
                return;
            }
        };

        let task = IngestionTask {
            envelope: ContentEnvelope::new(content_id.clone(), payload),
            content_id,
        };
        if !self.submitter.submit(task) {
            tracing::error!("Ingestion queue closed before the archive was exhausted");
            self.stats.record_failed();
        }
    }
}

fn parse_json(path: &str, body: &[u8]) -> Option<Value> {
    match serde_json::from_slice(body) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!("Failed to parse {}: {}", path, e);
            None
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
