//! Search Module
//!
//! Full-text search over content envelopes.
//!
//! ## Submodules
//! - **`tokenizer`**: Text analysis shared by indexing and querying.
//! - **`memory`**: In-process `SearchEngine` with atomic alias handling.
//! - **`elastic`**: `SearchEngine` backed by an Elasticsearch-compatible REST API.
//! - **`handlers`**: HTTP query endpoint over the active index generation.
//! - **`types`**: Request and response DTOs.

pub mod elastic;
pub mod handlers;
pub mod memory;
pub mod tokenizer;
pub mod types;
