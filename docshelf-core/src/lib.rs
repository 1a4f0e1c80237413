//! An embedded document store that keeps an indexed, in-memory collection of documents
//! and hands whole snapshots to a pluggable persistence adapter.
//!
//! This crate is the core of the docshelf project and provides:
//!
//! - **Document traits** ([`document`]) - The reflection descriptor documents expose to the indexer
//! - **Field values** ([`value`]) - Hashable scalars used as primary keys and index bucket keys
//! - **Persistence adapters** ([`adapter`]) - Whole-value read/write storage abstraction
//! - **Collections** ([`collection`]) - The primary-key map and secondary indexes kept in sync
//! - **Single-value stores** ([`single`]) - One value with a default, persisted as a whole
//! - **Registry** ([`registry`]) - Named stores with concurrent lifecycle fan-out
//! - **Error handling** ([`error`]) - Error kinds and the result alias
//!
//! # Example
//!
//! ```ignore
//! use docshelf::prelude::*;
//! use docshelf::memory::Memory;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! pub struct Task {
//!     pub id: u64,
//!     pub status: String,
//! }
//!
//! let tasks = Collection::<Task, _>::builder(Memory::new())
//!     .primary_key("id")
//!     .index("status")
//!     .build()?;
//!
//! tasks.read().await?;
//! tasks.create(Task { id: 1, status: "open".into() })?;
//! assert_eq!(tasks.find_by_indexed_field("status", "open")?.len(), 1);
//! tasks.write(false).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshelf;

pub mod adapter;
pub mod collection;
pub mod document;
pub mod error;
pub mod index;
pub mod registry;
pub mod single;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;
