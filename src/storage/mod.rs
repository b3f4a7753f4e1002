//! Storage Module
//!
//! The capability layer everything else is built on.
//!
//! ## Core Concepts
//! - **Facade**: `StorageFacade` is the only storage type callers depend on. It covers
//!   content persistence, search indexing, prefix listing, index administration, blobs,
//!   API keys and control state.
//! - **Composition**: `ComposedStorage` assembles the facade from three backend traits
//!   (`DocumentStore`, `BlobStore`, `SearchEngine`), one implementation per technology.
//! - **Idempotent deletes**: facade delete operations treat "not found" as success.

pub mod backend;
pub mod facade;
pub mod fs;
pub mod handlers;
pub mod memory;
pub mod pager;
pub mod types;

#[cfg(test)]
mod tests;
