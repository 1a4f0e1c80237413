//! Main docshelf crate providing an embedded, indexed document store.
//!
//! This crate is the primary entry point for users of docshelf. It re-exports the core
//! types from the sub-crates and gives access to the bundled persistence adapters.
//!
//! # Features
//!
//! - **Indexed collections** - A unique primary key plus equality indexes on any field
//! - **Deferred persistence** - Mutations stay in memory until an explicit write
//! - **Pluggable adapters** - Memory and file adapters, or implement [`adapter::Adapter`]
//! - **Registries** - Load and persist several stores with one call
//!
//! # Quick Start
//!
//! ```ignore
//! use docshelf::{prelude::*, fs::JsonFile};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Document)]
//! pub struct Task {
//!     pub id: u64,
//!     pub status: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> ShelfResult<()> {
//!     let tasks = Collection::<Task, _>::builder(JsonFile::new("data/tasks.json"))
//!         .name("tasks")
//!         .primary_key("id")
//!         .index("status")
//!         .build()?;
//!
//!     // Load whatever was persisted before
//!     tasks.read().await?;
//!
//!     tasks.create(Task { id: 1, status: "open".into() })?;
//!     tasks.create(Task { id: 2, status: "open".into() })?;
//!     tasks.update_by_primary_key(2, Task { id: 2, status: "done".into() })?;
//!
//!     let open = tasks.find_by_indexed_field("status", "open")?;
//!     println!("Open tasks: {:?}", open);
//!
//!     // Persist the whole document set in one atomic write
//!     tasks.write(false).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Registries
//!
//! ```ignore
//! use std::sync::Arc;
//! use docshelf::{prelude::*, memory::Memory};
//!
//! let tasks = Arc::new(Collection::<Task, _>::new(Memory::new(), "id", ["status"])?);
//! let settings = Arc::new(Single::new(Memory::new(), Settings::default()));
//!
//! let registry = Registry::new()
//!     .with("tasks", tasks.clone())?
//!     .with("settings", settings.clone())?;
//!
//! registry.init().await?;
//! // ... mutate tasks and settings ...
//! registry.write().await?;
//! ```
//!
//! # Adapters
//!
//! - [`memory`] - In-memory storage for tests and ephemeral data
//! - [`fs`] - Text, JSON and BSON files (requires the `fs` feature, on by default)

pub mod prelude;

pub use docshelf_core::{adapter, collection, document, error, index, registry, single, value};
pub use docshelf_macros::Document;

/// In-memory persistence adapters.
pub mod memory {
    pub use docshelf_memory::{Memory, MemoryBuilder};
}

/// File persistence adapters.
///
/// This module is only available when the `fs` feature is enabled.
#[cfg(feature = "fs")]
pub mod fs {
    pub use docshelf_fs::{
        BsonFile, Converter, DataFile, DataFileBuilder, JsonConverter, JsonFile, TextFile,
    };
}
