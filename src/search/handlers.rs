use super::types::{SearchParams, SearchResponse};
use crate::storage::facade::StorageFacade;
use crate::storage::types::SearchQuery;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

pub async fn handle_search(
    Query(params): Query<SearchParams>,
    Extension(storage): Extension<Arc<dyn StorageFacade>>,
) -> (StatusCode, Json<SearchResponse>) {
    let query = SearchQuery {
        text: params.q.clone(),
        category: params.category.clone(),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
        offset: params.offset.unwrap_or(0),
    };

    let mut filters = HashMap::new();
    if let Some(category) = &params.category {
        filters.insert("category".to_string(), category.clone());
    }

    match storage.search(&query).await {
        Ok(hits) => (
            StatusCode::OK,
            Json(SearchResponse {
                query: params.q,
                filters,
                total_count: hits.total,
                count: hits.hits.len(),
                results: hits.hits,
            }),
        ),
        Err(e) => {
            tracing::error!("Search for {:?} failed: {}", params.q, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SearchResponse {
                    query: params.q,
                    filters,
                    total_count: 0,
                    count: 0,
                    results: vec![],
                }),
            )
        }
    }
}
