//! In-memory Search Engine
//!
//! A single-process `SearchEngine`. Index creation, deletion and alias changes are
//! applied under one write lock, which gives `create_index` its create-if-absent
//! atomicity and `update_aliases` its all-or-nothing semantics.
//!
//! Scoring follows a plain term-match model: each query term contributes its
//! frequency across the analyzed (`Text`) fields of a document.

use super::tokenizer::{analyze_text, tokenize_query};
use crate::error::{StorageError, StorageResult};
use crate::storage::backend::SearchEngine;
use crate::storage::types::*;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::RwLock;

struct IndexedDoc {
    source: Value,
    terms: HashMap<String, usize>,
    keywords: HashSet<String>,
}

struct IndexState {
    created_at: u64,
    mapping: IndexMapping,
    docs: HashMap<String, IndexedDoc>,
}

impl IndexState {
    fn analyze(&self, doc: &Value) -> IndexedDoc {
        let mut terms: HashMap<String, usize> = HashMap::new();
        for field in self.mapping.fields_of(FieldKind::Text) {
            for text in field_strings(doc.get(field)) {
                for (term, count) in analyze_text(&text) {
                    *terms.entry(term).or_insert(0) += count;
                }
            }
        }

        let keywords = self
            .mapping
            .fields_of(FieldKind::Keyword)
            .flat_map(|field| field_strings(doc.get(field)))
            .collect();

        IndexedDoc {
            source: doc.clone(),
            terms,
            keywords,
        }
    }
}

#[derive(Default)]
struct EngineState {
    indices: HashMap<String, IndexState>,
    aliases: HashMap<String, BTreeSet<String>>,
}

impl EngineState {
    /// Resolves an index name or single-index alias to an index name.
    fn resolve(&self, target: &str) -> StorageResult<String> {
        if self.indices.contains_key(target) {
            return Ok(target.to_string());
        }

        let holders = self.aliases.get(target).map(|s| s.len()).unwrap_or(0);
        match holders {
            0 => Err(StorageError::NotFound(format!("index {}", target))),
            1 => Ok(self.aliases[target].iter().next().cloned().unwrap_or_default()),
            n => Err(StorageError::backend(format!(
                "alias {} points to {} indices",
                target, n
            ))),
        }
    }
}

/// Collects the string values of a field that may hold a string, an array or a scalar.
fn field_strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().flat_map(|v| field_strings(Some(v))).collect(),
        Some(Value::Number(n)) => vec![n.to_string()],
        Some(Value::Bool(b)) => vec![b.to_string()],
        _ => Vec::new(),
    }
}

#[derive(Default)]
pub struct MemorySearchEngine {
    state: RwLock<EngineState>,
}

impl MemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn document_count(&self, target: &str) -> StorageResult<usize> {
        let state = self.state.read().await;
        let index = state.resolve(target)?;
        Ok(state.indices[&index].docs.len())
    }
}

#[async_trait]
impl SearchEngine for MemorySearchEngine {
    async fn create_index(&self, name: &str, mapping: &IndexMapping) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if state.indices.contains_key(name) || state.aliases.contains_key(name) {
            return Err(StorageError::AlreadyExists(name.to_string()));
        }

        state.indices.insert(
            name.to_string(),
            IndexState {
                created_at: now_ms(),
                mapping: mapping.clone(),
                docs: HashMap::new(),
            },
        );
        tracing::debug!("Created index {}", name);
        Ok(())
    }

    async fn list_indices(&self) -> StorageResult<Vec<IndexGeneration>> {
        let state = self.state.read().await;
        let mut indices: Vec<IndexGeneration> = state
            .indices
            .iter()
            .map(|(name, index)| IndexGeneration {
                name: name.clone(),
                created_at: index.created_at,
            })
            .collect();
        indices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(indices)
    }

    async fn indices_for_alias(&self, alias: &str) -> StorageResult<Vec<String>> {
        let state = self.state.read().await;
        Ok(state
            .aliases
            .get(alias)
            .map(|holders| holders.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> StorageResult<()> {
        let mut state = self.state.write().await;

        // Validate everything before mutating anything.
        for action in actions {
            if let AliasAction::Add { index, .. } = action
                && !state.indices.contains_key(index)
            {
                return Err(StorageError::NotFound(format!("index {}", index)));
            }
        }

        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    state
                        .aliases
                        .entry(alias.clone())
                        .or_default()
                        .insert(index.clone());
                }
                AliasAction::Remove { index, alias } => {
                    if let Some(holders) = state.aliases.get_mut(alias) {
                        holders.remove(index);
                        if holders.is_empty() {
                            state.aliases.remove(alias);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> StorageResult<()> {
        let mut state = self.state.write().await;
        if state.indices.remove(name).is_none() {
            return Err(StorageError::NotFound(format!("index {}", name)));
        }
        state.aliases.retain(|_, holders| {
            holders.remove(name);
            !holders.is_empty()
        });
        tracing::debug!("Deleted index {}", name);
        Ok(())
    }

    async fn index_document(&self, target: &str, id: &str, doc: &Value) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let name = state.resolve(target)?;
        if let Some(index) = state.indices.get_mut(&name) {
            let indexed = index.analyze(doc);
            index.docs.insert(id.to_string(), indexed);
        }
        Ok(())
    }

    async fn delete_document(&self, target: &str, id: &str) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let name = state.resolve(target)?;
        let removed = state
            .indices
            .get_mut(&name)
            .and_then(|index| index.docs.remove(id));
        match removed {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(format!("{}/{}", name, id))),
        }
    }

    async fn bulk_delete(&self, target: &str, ids: &[String]) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let name = state.resolve(target)?;
        if let Some(index) = state.indices.get_mut(&name) {
            for id in ids {
                index.docs.remove(id);
            }
        }
        Ok(())
    }

    async fn search(&self, target: &str, query: &SearchQuery) -> StorageResult<SearchHits> {
        let state = self.state.read().await;
        let name = state.resolve(target)?;
        let index = &state.indices[&name];
        let query_terms = tokenize_query(&query.text);

        let mut scored: Vec<(&String, usize, &IndexedDoc)> = index
            .docs
            .iter()
            .filter(|(_, doc)| {
                query
                    .category
                    .as_ref()
                    .is_none_or(|category| doc.keywords.contains(category))
            })
            .map(|(id, doc)| {
                let score = query_terms
                    .iter()
                    .map(|term| doc.terms.get(term).copied().unwrap_or(0))
                    .sum();
                (id, score, doc)
            })
            .filter(|(_, score, _)| query_terms.is_empty() || *score > 0)
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let total = scored.len();
        let hits = scored
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .map(|(id, score, doc)| SearchHit {
                content_id: id.clone(),
                score: score as f64,
                source: doc.source.clone(),
            })
            .collect();

        Ok(SearchHits { total, hits })
    }
}
