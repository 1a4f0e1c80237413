//! Error types and result types for document store operations.
//!
//! Every fallible operation returns [`ShelfResult<T>`]. Errors raised by a collection
//! operation are raised before any state is touched, so the collection stays usable.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when working with a shelf.
#[derive(Error, Debug)]
pub enum ShelfError {
    /// The collection or registry was configured inconsistently, e.g. the primary key
    /// field is also registered as an indexed field.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A document with the given primary key already exists.
    /// The first argument is the key, the second is the collection name.
    #[error("Primary key {0} already exists in collection {1}")]
    DuplicateKey(String, String),
    /// No document has the given primary key.
    /// The first argument is the key, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    NotFound(String, String),
    /// An update tried to change a document's primary key.
    /// The arguments are the current key, the attempted key and the collection name.
    #[error("Primary key {0} cannot be changed to {1} in collection {2}")]
    ImmutableKey(String, String, String),
    /// A lookup named a field that was never registered as indexed.
    /// The first argument is the field, the second is the collection name.
    #[error("Index for field {0} not found in collection {1}")]
    UnknownIndex(String, String),
    /// Converting between documents and their persisted representation failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An I/O error raised by a persistence adapter.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Any other failure reported by a persistence adapter.
    #[error("Adapter error: {0}")]
    Adapter(String),
}

/// A specialized `Result` type for shelf operations.
pub type ShelfResult<T> = Result<T, ShelfError>;

impl From<BsonError> for ShelfError {
    fn from(err: BsonError) -> Self {
        ShelfError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for ShelfError {
    fn from(err: SerdeJsonError) -> Self {
        ShelfError::Serialization(err.to_string())
    }
}
