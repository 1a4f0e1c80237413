//! Core traits for documents stored in a collection.
//!
//! A collection never inspects documents through reflection. Instead every document type
//! describes its own fields through [`Document`], usually by deriving it with
//! `#[derive(Document)]`.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::{error::ShelfResult, value::FieldValue};

/// Core trait that all documents stored in a collection must implement.
///
/// The trait is a reflection descriptor: it lists the fields a collection may use as its
/// primary key or as secondary indexes, and reads a field's current value by name.
///
/// # Deriving
///
/// `#[derive(Document)]` implements this trait for structs with named fields whose types
/// convert into [`FieldValue`]. Fields without such a conversion are marked
/// `#[document(skip)]`; `#[document(rename = "...")]` changes the name a field is
/// addressed by.
///
/// # Example
///
/// ```ignore
/// use docshelf::document::{Document, FieldValue};
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Task {
///     pub id: u64,
///     pub status: String,
/// }
///
/// impl Document for Task {
///     fn field_names() -> &'static [&'static str] {
///         &["id", "status"]
///     }
///
///     fn field(&self, name: &str) -> Option<FieldValue> {
///         match name {
///             "id" => Some(self.id.into()),
///             "status" => Some(self.status.as_str().into()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the names of every field addressable through [`Document::field`].
    fn field_names() -> &'static [&'static str];

    /// Returns the current value of the named field, or `None` if the document has no
    /// field by that name.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Returns whether `name` is one of [`Document::field_names`].
    fn has_field(name: &str) -> bool {
        Self::field_names().contains(&name)
    }
}

/// Extension trait providing JSON conversion for documents.
///
/// Automatically implemented for every [`Document`].
pub trait DocumentExt: Document {
    /// Reads a field, treating a missing field as [`FieldValue::Null`].
    fn field_or_null(&self, name: &str) -> FieldValue;

    /// Converts this document to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_json(&self) -> ShelfResult<Value>;

    /// Creates a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_json(value: Value) -> ShelfResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn field_or_null(&self, name: &str) -> FieldValue {
        self.field(name).unwrap_or(FieldValue::Null)
    }

    fn to_json(&self) -> ShelfResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> ShelfResult<Self> {
        Ok(from_value(value)?)
    }
}
