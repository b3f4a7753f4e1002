use super::pipeline::ingest_archive;
use super::types::{ErrorResponse, IngestReport};
use crate::config::IngestSettings;
use crate::error::IngestError;
use crate::storage::facade::StorageFacade;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;

/// `POST /content/bulk`: body is a gzip-compressed tar archive.
///
/// 200 with the report when every record was accepted, 500 with the report when some
/// failed, 400 for an unreadable archive and 500 when reconciliation fails.
pub async fn handle_bulk_upload(
    Extension(storage): Extension<Arc<dyn StorageFacade>>,
    Extension(settings): Extension<Arc<IngestSettings>>,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    tracing::info!("Bulk upload received: {} bytes", body.len());

    match ingest_archive(storage, Cursor::new(body), *settings).await {
        Ok(report) => (report_status(&report), Json(to_json(&report))),
        Err(e) => {
            let status = match e {
                IngestError::MalformedArchive(_) => StatusCode::BAD_REQUEST,
                IngestError::Reconciliation(_) | IngestError::Internal(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            tracing::error!("Bulk upload failed: {}", e);
            (status, Json(to_json(&ErrorResponse { error: e.to_string() })))
        }
    }
}

fn report_status(report: &IngestReport) -> StatusCode {
    if report.failed == 0 {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
