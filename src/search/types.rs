use crate::storage::types::SearchHit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub filters: HashMap<String, String>,
    pub total_count: usize,
    pub count: usize,
    pub results: Vec<SearchHit>,
}
