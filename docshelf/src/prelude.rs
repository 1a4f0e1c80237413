//! Convenient re-exports of commonly used types from docshelf.
//!
//! ```ignore
//! use docshelf::prelude::*;
//! ```

pub use docshelf_core::{
    adapter::{Adapter, AdapterBuilder, DynAdapter},
    collection::{Collection, CollectionBuilder},
    document::{Document, DocumentExt},
    error::{ShelfError, ShelfResult},
    registry::{Content, Registry},
    single::Single,
    value::{FieldValue, KeySet},
};
pub use docshelf_macros::Document;
