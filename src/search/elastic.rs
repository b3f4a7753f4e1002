//! Elasticsearch-compatible Search Engine
//!
//! Talks to an Elasticsearch/OpenSearch style REST API. Index creation is atomic on the
//! server side (`resource_already_exists_exception` maps to `AlreadyExists`), and alias
//! swaps go through a single `_aliases` request so the server applies them atomically.
//!
//! Transport errors on idempotent requests (reads, document PUT/DELETE, searches and
//! bulk deletes) are retried with exponential backoff plus jitter. Index creation and
//! alias updates go out exactly once: a lost response on a request the server already
//! applied would turn into a spurious `AlreadyExists` or `NotFound` on the retry.
//! HTTP error statuses are never retried.

use crate::error::{StorageError, StorageResult};
use crate::storage::backend::SearchEngine;
use crate::storage::types::*;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_ATTEMPTS: usize = 3;

#[derive(Debug, Deserialize)]
struct CatIndex {
    index: String,
    #[serde(rename = "creation.date")]
    creation_date: Option<String>,
}

pub struct ElasticSearchEngine {
    base_url: String,
    http_client: reqwest::Client,
    request_timeout: Duration,
}

impl ElasticSearchEngine {
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
            request_timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn doc_url(&self, target: &str, id: &str) -> String {
        self.url(&format!("{}/_doc/{}", target, urlencoding::encode(id)))
    }

    async fn send_with_retry<F>(&self, build: F) -> StorageResult<reqwest::Response>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut delay_ms = 150u64;

        for attempt in 0..RETRY_ATTEMPTS {
            match build(&self.http_client)
                .timeout(self.request_timeout)
                .send()
                .await
            {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == RETRY_ATTEMPTS {
                        return Err(e.into());
                    }
                    tracing::warn!("Search engine request failed (attempt {}): {}", attempt + 1, e);
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(StorageError::backend("Retry attempts exhausted"))
    }

    /// Sends a request that must not be repeated.
    async fn send_once(
        &self,
        request: reqwest::RequestBuilder,
    ) -> StorageResult<reqwest::Response> {
        Ok(request.timeout(self.request_timeout).send().await?)
    }

    /// Passes successful responses through and converts failures into `StorageError`.
    async fn check(response: reqwest::Response, what: &str) -> StorageResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let error_type = body
            .pointer("/error/type")
            .and_then(Value::as_str)
            .unwrap_or_default();

        if error_type == "resource_already_exists_exception" {
            return Err(StorageError::AlreadyExists(what.to_string()));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(what.to_string()));
        }
        Err(StorageError::backend(format!("{} failed: {} {}", what, status, body)))
    }

    pub(crate) fn mapping_body(mapping: &IndexMapping) -> Value {
        let properties: serde_json::Map<String, Value> = mapping
            .fields
            .iter()
            .map(|field| {
                let kind = match field.kind {
                    FieldKind::Text => "text",
                    FieldKind::Keyword => "keyword",
                };
                (field.name.clone(), json!({ "type": kind }))
            })
            .collect();
        json!({ "mappings": { "properties": properties } })
    }

    pub(crate) fn search_body(query: &SearchQuery) -> Value {
        let text_fields: Vec<String> = IndexMapping::content()
            .fields_of(FieldKind::Text)
            .map(str::to_string)
            .collect();

        let must = if query.text.trim().is_empty() {
            json!({ "match_all": {} })
        } else {
            json!({ "multi_match": { "query": query.text, "fields": text_fields } })
        };

        let filter: Vec<Value> = query
            .category
            .iter()
            .map(|category| json!({ "term": { "categories": category } }))
            .collect();

        json!({
            "from": query.offset,
            "size": query.limit,
            "query": { "bool": { "must": must, "filter": filter } }
        })
    }
}

#[async_trait]
impl SearchEngine for ElasticSearchEngine {
    async fn create_index(&self, name: &str, mapping: &IndexMapping) -> StorageResult<()> {
        let url = self.url(name);
        let body = Self::mapping_body(mapping);
        let response = self
            .send_once(self.http_client.put(&url).json(&body))
            .await?;
        Self::check(response, &format!("index {}", name)).await?;
        Ok(())
    }

    async fn list_indices(&self) -> StorageResult<Vec<IndexGeneration>> {
        let url = self.url("_cat/indices?format=json&h=index,creation.date");
        let response = self.send_with_retry(|c| c.get(&url)).await?;
        let rows: Vec<CatIndex> = Self::check(response, "index listing").await?.json().await?;

        let mut indices: Vec<IndexGeneration> = rows
            .into_iter()
            .filter(|row| !row.index.starts_with('.'))
            .map(|row| IndexGeneration {
                created_at: row
                    .creation_date
                    .and_then(|d| d.parse().ok())
                    .unwrap_or(0),
                name: row.index,
            })
            .collect();
        indices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indices)
    }

    async fn indices_for_alias(&self, alias: &str) -> StorageResult<Vec<String>> {
        let url = self.url(&format!("_alias/{}", alias));
        let response = self.send_with_retry(|c| c.get(&url)).await?;
        let body: Value = match Self::check(response, &format!("alias {}", alias)).await {
            Ok(resp) => resp.json().await?,
            Err(e) if e.is_not_found() => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names: Vec<String> = body
            .as_object()
            .map(|indices| indices.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> StorageResult<()> {
        let actions: Vec<Value> = actions
            .iter()
            .map(|action| match action {
                AliasAction::Add { index, alias } => {
                    json!({ "add": { "index": index, "alias": alias } })
                }
                AliasAction::Remove { index, alias } => {
                    json!({ "remove": { "index": index, "alias": alias } })
                }
            })
            .collect();
        let body = json!({ "actions": actions });

        let url = self.url("_aliases");
        let response = self
            .send_once(self.http_client.post(&url).json(&body))
            .await?;
        Self::check(response, "alias update").await?;
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> StorageResult<()> {
        let url = self.url(name);
        let response = self.send_with_retry(|c| c.delete(&url)).await?;
        Self::check(response, &format!("index {}", name)).await?;
        Ok(())
    }

    async fn index_document(&self, target: &str, id: &str, doc: &Value) -> StorageResult<()> {
        let url = self.doc_url(target, id);
        let response = self.send_with_retry(|c| c.put(&url).json(doc)).await?;
        Self::check(response, &format!("{}/{}", target, id)).await?;
        Ok(())
    }

    async fn delete_document(&self, target: &str, id: &str) -> StorageResult<()> {
        let url = self.doc_url(target, id);
        let response = self.send_with_retry(|c| c.delete(&url)).await?;
        Self::check(response, &format!("{}/{}", target, id)).await?;
        Ok(())
    }

    async fn bulk_delete(&self, target: &str, ids: &[String]) -> StorageResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut payload = String::new();
        for id in ids {
            payload.push_str(&json!({ "delete": { "_id": id } }).to_string());
            payload.push('\n');
        }

        let url = self.url(&format!("{}/_bulk", target));
        let response = self
            .send_with_retry(|c| {
                c.post(&url)
                    .header("content-type", "application/x-ndjson")
                    .body(payload.clone())
            })
            .await?;
        let body: Value = Self::check(response, &format!("bulk delete on {}", target))
            .await?
            .json()
            .await?;

        if body.get("errors").and_then(Value::as_bool).unwrap_or(false) {
            let failed = body
                .get("items")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.pointer("/delete/status").and_then(Value::as_u64))
                        .filter(|status| *status >= 300 && *status != 404)
                        .count()
                })
                .unwrap_or(0);
            if failed > 0 {
                return Err(StorageError::backend(format!(
                    "bulk delete on {}: {} items failed",
                    target, failed
                )));
            }
        }
        Ok(())
    }

    async fn search(&self, target: &str, query: &SearchQuery) -> StorageResult<SearchHits> {
        let url = self.url(&format!("{}/_search", target));
        let body = Self::search_body(query);
        let response = self.send_with_retry(|c| c.post(&url).json(&body)).await?;
        let result: Value = Self::check(response, &format!("search on {}", target))
            .await?
            .json()
            .await?;

        let total = result
            .pointer("/hits/total/value")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;

        let hits = result
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|hits| {
                hits.iter()
                    .map(|hit| SearchHit {
                        content_id: hit
                            .get("_id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                        score: hit.get("_score").and_then(Value::as_f64).unwrap_or(0.0),
                        source: hit.get("_source").cloned().unwrap_or(Value::Null),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(SearchHits { total, hits })
    }
}
