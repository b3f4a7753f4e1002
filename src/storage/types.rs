//! Storage Data Types
//!
//! Records that cross the `StorageFacade` boundary: content envelopes, listing pages,
//! index generations and their field mappings, alias actions, API keys and search hits.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Collection holding content envelopes in the document store.
pub const CONTENT_COLLECTION: &str = "content";
/// Collection holding API keys.
pub const API_KEY_COLLECTION: &str = "api_keys";
/// Collection holding control-state values.
pub const CONTROL_COLLECTION: &str = "control";

/// A content record: an identifier plus an arbitrary JSON object payload.
///
/// Serialized flat, with the identifier stored under `contentID` next to the payload keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentEnvelope {
    #[serde(rename = "contentID")]
    pub content_id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ContentEnvelope {
    pub fn new(content_id: impl Into<String>, mut payload: Map<String, Value>) -> Self {
        // The id lives in its own field; a payload copy would serialize twice.
        payload.remove("contentID");
        Self {
            content_id: content_id.into(),
            payload,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut doc = self.payload.clone();
        doc.insert("contentID".to_string(), Value::String(self.content_id.clone()));
        Value::Object(doc)
    }
}

/// One page of an id listing.
///
/// `marker` is the continuation point for the next request (the last id in `ids`);
/// it is `None` when the page is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub ids: Vec<String>,
    pub marker: Option<String>,
}

impl ListPage {
    pub fn from_ids(ids: Vec<String>) -> Self {
        let marker = ids.last().cloned();
        Self { ids, marker }
    }
}

/// A physical search index generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexGeneration {
    pub name: String,
    /// Creation time in epoch milliseconds.
    #[serde(rename = "createdAt")]
    pub created_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Analyzed free text.
    Text,
    /// Exact match.
    Keyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub name: String,
    pub kind: FieldKind,
}

/// Explicit field mapping applied when an index is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMapping {
    pub fields: Vec<FieldMapping>,
}

impl IndexMapping {
    /// Mapping for content generations: title/body/keywords analyzed, categories exact.
    pub fn content() -> Self {
        let field = |name: &str, kind| FieldMapping {
            name: name.to_string(),
            kind,
        };
        Self {
            fields: vec![
                field("title", FieldKind::Text),
                field("body", FieldKind::Text),
                field("keywords", FieldKind::Text),
                field("categories", FieldKind::Keyword),
            ],
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields_of(&self, kind: FieldKind) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(move |f| f.kind == kind)
            .map(|f| f.name.as_str())
    }
}

/// One action of an atomic alias update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
    pub owner: String,
    #[serde(rename = "createdAt")]
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// Exact-match filter on `categories`.
    pub category: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "contentID")]
    pub content_id: String,
    pub score: f64,
    pub source: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHits {
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

/// Current system time in epoch milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
