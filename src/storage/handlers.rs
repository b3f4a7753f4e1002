use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;

use super::facade::StorageFacade;
use super::types::ContentEnvelope;

#[derive(Debug, Serialize)]
pub struct StoreBlobResponse {
    pub key: String,
    pub success: bool,
}

pub async fn handle_get_content(
    Extension(storage): Extension<Arc<dyn StorageFacade>>,
    Path(content_id): Path<String>,
) -> (StatusCode, Json<Option<ContentEnvelope>>) {
    match storage.get_envelope(&content_id).await {
        Ok(Some(envelope)) => (StatusCode::OK, Json(Some(envelope))),
        Ok(None) => (StatusCode::NOT_FOUND, Json(None)),
        Err(e) => {
            tracing::error!("Failed to load content {}: {}", content_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(None))
        }
    }
}

pub async fn handle_put_blob(
    Extension(storage): Extension<Arc<dyn StorageFacade>>,
    Path(key): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<StoreBlobResponse>) {
    match storage.store_blob(&key, body.to_vec()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(StoreBlobResponse { key, success: true }),
        ),
        Err(e) => {
            tracing::error!("Failed to store blob {}: {}", key, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StoreBlobResponse {
                    key,
                    success: false,
                }),
            )
        }
    }
}

pub async fn handle_get_blob(
    Extension(storage): Extension<Arc<dyn StorageFacade>>,
    Path(key): Path<String>,
) -> (StatusCode, Vec<u8>) {
    match storage.retrieve_blob(&key).await {
        Ok(Some(bytes)) => (StatusCode::OK, bytes),
        Ok(None) => (StatusCode::NOT_FOUND, Vec::new()),
        Err(e) => {
            tracing::error!("Failed to retrieve blob {}: {}", key, e);
            (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
        }
    }
}
