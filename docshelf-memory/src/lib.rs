//! In-memory persistence adapter for docshelf.
//!
//! [`Memory`] keeps the last written value in memory. It is ideal for tests, for
//! ephemeral data, and as a stand-in while choosing a durable adapter.
//!
//! # Quick Start
//!
//! ```ignore
//! use docshelf::{prelude::*, memory::Memory};
//!
//! #[tokio::main]
//! async fn main() -> ShelfResult<()> {
//!     let tasks = Collection::<Task, _>::builder(Memory::new())
//!         .primary_key("id")
//!         .index("status")
//!         .build()?;
//!
//!     tasks.read().await?;
//!     tasks.create(Task { id: 1, status: "open".into() })?;
//!     tasks.write(false).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;

pub use store::{Memory, MemoryBuilder};
