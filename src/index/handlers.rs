use super::lifecycle::{IndexLifecycleManager, RotationOutcome};
use super::reindex::reindex_from_documents;
use crate::config::IngestSettings;
use crate::storage::facade::StorageFacade;
use crate::storage::types::IndexGeneration;

use axum::{Extension, Json, http::StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct IndexStatusResponse {
    pub active: Option<IndexGeneration>,
    pub aliased: Vec<String>,
}

pub async fn handle_rotate_index(
    Extension(storage): Extension<Arc<dyn StorageFacade>>,
    Extension(settings): Extension<Arc<IngestSettings>>,
) -> (StatusCode, Json<Value>) {
    let manager = IndexLifecycleManager::new(storage.clone());
    let page_size = settings.page_size;

    let outcome = manager
        .rotate_with(move |generation| async move {
            reindex_from_documents(storage.as_ref(), &generation, page_size)
                .await
                .map(|_| ())
        })
        .await;

    match outcome {
        Ok(outcome) => {
            if let RotationOutcome::Rotated { generation, .. } = &outcome {
                tracing::info!("Index rotation completed: {}", generation.name);
            }
            (
                StatusCode::OK,
                Json(serde_json::to_value(&outcome).unwrap_or(Value::Null)),
            )
        }
        Err(e) => {
            tracing::error!("Index rotation failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

pub async fn handle_index_status(
    Extension(storage): Extension<Arc<dyn StorageFacade>>,
) -> (StatusCode, Json<Option<IndexStatusResponse>>) {
    let manager = IndexLifecycleManager::new(storage);

    let status = async {
        Ok::<_, crate::error::StorageError>(IndexStatusResponse {
            active: manager.active_generation().await?,
            aliased: manager.aliased_indices().await?,
        })
    }
    .await;

    match status {
        Ok(status) => (StatusCode::OK, Json(Some(status))),
        Err(e) => {
            tracing::error!("Failed to read index status: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Json(None))
        }
    }
}
