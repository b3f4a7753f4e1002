//! Content Backend Library
//!
//! Bulk content ingestion and full-text search over a pluggable storage tier.
//! The binary (`main.rs`) wires configuration, storage and the HTTP router together.
//!
//! ## Architecture Modules
//!
//! - **`storage`**: The capability layer. `StorageFacade` over document, blob and
//!   search backends, with in-memory and filesystem/Elasticsearch realizations.
//! - **`ingestion`**: The bulk upload pipeline. Decodes a gzip tar archive, stores and
//!   indexes each record under bounded concurrency, then reconciles deletions.
//! - **`index`**: The index lifecycle. Builds a new search generation in the background
//!   and promotes it atomically behind a latch.
//! - **`search`**: Tokenizing, the in-memory engine, the Elasticsearch client and the
//!   query endpoint.
//! - **`config`** / **`error`**: Server flags and the shared error types.

pub mod config;
pub mod error;
pub mod index;
pub mod ingestion;
pub mod search;
pub mod storage;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Extension, Router};
use std::sync::Arc;

use config::IngestSettings;
use storage::facade::StorageFacade;

/// Builds the HTTP router over a storage tier.
pub fn build_router(
    storage: Arc<dyn StorageFacade>,
    settings: IngestSettings,
    max_upload_bytes: usize,
) -> Router {
    Router::new()
        .route(
            "/content/bulk",
            post(ingestion::handlers::handle_bulk_upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/content/:id", get(storage::handlers::handle_get_content))
        .route("/search", get(search::handlers::handle_search))
        .route("/admin/index", get(index::handlers::handle_index_status))
        .route(
            "/admin/index/rotate",
            post(index::handlers::handle_rotate_index),
        )
        .route(
            "/blobs/:key",
            get(storage::handlers::handle_get_blob).put(storage::handlers::handle_put_blob),
        )
        .layer(Extension(storage))
        .layer(Extension(Arc::new(settings)))
}
