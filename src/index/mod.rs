//! Index Lifecycle Module
//!
//! Zero-downtime rebuilds of the search index.
//!
//! ## Naming
//! - Generations are named `<INDEX_PREFIX>_<creation-epoch-millis>`.
//! - Readers and writers address the active generation through `ACTIVE_ALIAS` only.
//! - `LATCH_NAME` is the sentinel index whose existence means a rebuild is in progress.
//!   It shares the generation prefix, so garbage collection removes it with the
//!   retired generations.

pub mod handlers;
pub mod lifecycle;
pub mod reindex;

#[cfg(test)]
mod tests;

pub const INDEX_PREFIX: &str = "content";
pub const ACTIVE_ALIAS: &str = "content_active";
pub const LATCH_NAME: &str = "content_rebuild";

/// Control-state key recording the most recently promoted generation.
pub const ACTIVE_GENERATION_KEY: &str = "search.active_generation";
