//! File persistence adapters for docshelf.
//!
//! Every adapter here stores its whole value in one file and follows the same rules:
//!
//! - **Missing file reads as absent** - a store backed by a file that was never written
//!   starts out empty instead of failing
//! - **Atomic replace** - a write lands in a temporary sibling file that is then renamed
//!   over the target, so readers see either the old or the new content
//! - **Lazy directories** - a missing parent directory is created on the first write
//! - **Serialised writers** - concurrent writes through one adapter (and its clones) never
//!   interleave
//!
//! # Adapters
//!
//! - [`TextFile`] - raw UTF-8 text
//! - [`DataFile`] - any value, through a pluggable [`Converter`]
//! - [`JsonFile`] - a [`DataFile`] using JSON
//! - [`BsonFile`] - binary BSON
//!
//! # Example
//!
//! ```ignore
//! use docshelf::{prelude::*, fs::JsonFile};
//!
//! let tasks = Collection::<Task, _>::builder(JsonFile::new("data/tasks.json"))
//!     .primary_key("id")
//!     .index("status")
//!     .build()?;
//!
//! tasks.read().await?;
//! ```

mod atomic;

pub mod bson_file;
pub mod data;
pub mod text;

pub use bson_file::BsonFile;
pub use data::{Converter, DataFile, DataFileBuilder, JsonConverter, JsonFile};
pub use text::TextFile;
