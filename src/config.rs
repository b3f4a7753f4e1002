//! Server Configuration
//!
//! Command-line flags (with environment fallbacks) for the server binary, and the
//! settings derived from them that the ingestion pipeline and the admin routes consume.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Reference concurrency for the ingestion worker pool.
pub const DEFAULT_INGEST_WORKERS: usize = 10;
/// Ids requested per listing page during reconciliation and reindexing.
pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageKind {
    /// Everything in process memory. Nothing survives a restart.
    Memory,
    /// Filesystem document/blob stores plus an Elasticsearch-compatible engine.
    Distributed,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "content-backend", about = "Content ingestion and search backend")]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[arg(long = "bind", env = "CONTENT_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Storage realization to use.
    #[arg(long = "storage", env = "CONTENT_STORAGE", value_enum, default_value = "memory")]
    pub storage: StorageKind,

    /// Root directory for the filesystem document and blob stores.
    #[arg(long = "data-dir", env = "CONTENT_DATA_DIR", value_name = "PATH", default_value = "data")]
    pub data_dir: PathBuf,

    /// Base URL of the search engine REST API.
    #[arg(long = "elastic-url", env = "CONTENT_ELASTIC_URL", default_value = "http://127.0.0.1:9200")]
    pub elastic_url: String,

    /// Concurrent store/index tasks per bulk upload.
    #[arg(long = "ingest-workers", env = "CONTENT_INGEST_WORKERS", default_value_t = DEFAULT_INGEST_WORKERS)]
    pub ingest_workers: usize,

    /// Page size for prefix listings.
    #[arg(long = "list-page-size", env = "CONTENT_LIST_PAGE_SIZE", default_value_t = DEFAULT_LIST_PAGE_SIZE)]
    pub list_page_size: usize,

    /// Largest accepted bulk upload, in MiB.
    #[arg(long = "max-upload-mb", env = "CONTENT_MAX_UPLOAD_MB", default_value_t = 512)]
    pub max_upload_mb: usize,
}

impl ServerConfig {
    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            workers: self.ingest_workers.max(1),
            page_size: self.list_page_size.max(1),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    pub workers: usize,
    pub page_size: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_INGEST_WORKERS,
            page_size: DEFAULT_LIST_PAGE_SIZE,
        }
    }
}
