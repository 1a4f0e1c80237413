//! Indexed document collections.
//!
//! A [`Collection`] owns an ordered document set keyed by primary key plus one
//! [`SecondaryIndex`] per indexed field, and keeps all of them in sync across every
//! mutation. Mutations only touch memory and mark the collection dirty; the whole document
//! set is handed to the [`Adapter`] when [`Collection::write`] is called.
//!
//! # Example
//!
//! ```ignore
//! use docshelf::prelude::*;
//! use docshelf::memory::Memory;
//!
//! let tasks = Collection::<Task, _>::builder(Memory::new())
//!     .name("tasks")
//!     .primary_key("id")
//!     .index("status")
//!     .build()?;
//!
//! tasks.create(Task { id: 1, status: "open".into() })?;
//! tasks.create(Task { id: 2, status: "open".into() })?;
//! tasks.update_by_primary_key(1, Task { id: 1, status: "closed".into() })?;
//!
//! assert_eq!(tasks.find_by_indexed_field("status", "open")?.len(), 1);
//! tasks.write(false).await?;
//! ```

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::{collections::HashSet, fmt, marker::PhantomData};

use crate::{
    adapter::Adapter,
    document::{Document, DocumentExt},
    error::{ShelfError, ShelfResult},
    index::SecondaryIndex,
    value::{FieldValue, KeySet},
};

const DEFAULT_NAME: &str = "collection";

/// Document set, primary index and secondary indexes behind one lock.
///
/// The document set doubles as the primary index: it maps each primary key to the document
/// owning it, in the order documents were added. Secondary buckets hold primary keys only.
struct State<D> {
    documents: IndexMap<FieldValue, D>,
    indexes: IndexMap<String, SecondaryIndex>,
    dirty: bool,
}

impl<D: Document> State<D> {
    fn index_document(&mut self, key: &FieldValue, document: &D) {
        for index in self.indexes.values_mut() {
            let value = document.field_or_null(index.field());
            index.insert(value, key.clone());
        }
    }

    fn unindex_document(&mut self, key: &FieldValue, document: &D) {
        for index in self.indexes.values_mut() {
            let value = document.field_or_null(index.field());
            index.remove(&value, key);
        }
    }

    /// Replaces the whole document set and rebuilds every index in one pass.
    ///
    /// Returns the number of documents dropped because a later document had the same
    /// primary key.
    fn rebuild(&mut self, documents: Vec<D>, primary_key: &str) -> usize {
        self.documents.clear();
        self.documents.reserve(documents.len());

        for index in self.indexes.values_mut() {
            index.clear();
        }

        let mut collapsed = 0;

        for document in documents {
            let key = document.field_or_null(primary_key);

            if self.documents.insert(key, document).is_some() {
                collapsed += 1;
            }
        }

        let State {
            documents, indexes, ..
        } = self;

        for (key, document) in documents.iter() {
            for index in indexes.values_mut() {
                index.insert(document.field_or_null(index.field()), key.clone());
            }
        }

        collapsed
    }
}

/// An in-memory document collection with a unique primary key and equality indexes.
///
/// All operations take `&self`; the collection can be shared behind an `Arc` and
/// registered in a [`Registry`](crate::registry::Registry). Mutations run to completion
/// under an internal lock and never suspend, so no caller observes a half-updated index.
/// The only suspension points are the adapter calls inside [`Collection::read`] and
/// [`Collection::write`], and no lock is held across them.
///
/// # Type Parameters
///
/// * `D` - The document type
/// * `A` - The persistence adapter, storing the whole document set as a `Vec<D>`
pub struct Collection<D: Document, A: Adapter<Vec<D>>> {
    name: String,
    primary_key: String,
    adapter: A,
    state: RwLock<State<D>>,
}

impl<D: Document, A: Adapter<Vec<D>>> fmt::Debug for Collection<D, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();

        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("indexed_fields", &state.indexes.keys().collect::<Vec<_>>())
            .field("len", &state.documents.len())
            .field("dirty", &state.dirty)
            .field("adapter", &self.adapter)
            .finish()
    }
}

impl<D: Document, A: Adapter<Vec<D>>> Collection<D, A> {
    /// Creates a builder for a collection persisted through `adapter`.
    pub fn builder(adapter: A) -> CollectionBuilder<D, A> {
        CollectionBuilder::new(adapter)
    }

    /// Creates a collection keyed on `primary_key` with the given indexed fields.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::Configuration`] if a field is unknown to `D` or if the
    /// primary key field is also listed as an indexed field.
    pub fn new<I, S>(adapter: A, primary_key: &str, indexed_fields: I) -> ShelfResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder(adapter)
            .primary_key(primary_key)
            .indexes(indexed_fields)
            .build()
    }

    /// Returns the name used in log lines and error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key_field(&self) -> &str {
        &self.primary_key
    }

    /// Returns the indexed fields in registration order.
    pub fn indexed_fields(&self) -> Vec<String> {
        self.state.read().indexes.keys().cloned().collect()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Returns whether the document set changed since it was last handed to the adapter.
    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().documents.is_empty()
    }

    /// Loads the full document set from the adapter and rebuilds every index.
    ///
    /// An absent stored value loads as an empty collection. Loading does not change the
    /// dirty flag.
    ///
    /// # Errors
    ///
    /// Adapter failures are returned unchanged; the in-memory state is left as it was.
    pub async fn read(&self) -> ShelfResult<()> {
        let documents = self
            .adapter
            .read()
            .await
            .inspect_err(|err| log::error!("Failed to read collection {}: {}", self.name, err))?
            .unwrap_or_default();

        let count = documents.len();
        let collapsed = self.state.write().rebuild(documents, &self.primary_key);

        if collapsed > 0 {
            log::warn!(
                "Collection {} loaded {} documents sharing a primary key; kept the last of each",
                self.name,
                collapsed
            );
        }

        log::debug!("Read {} documents into collection {}", count - collapsed, self.name);

        Ok(())
    }

    /// Hands the current document set to the adapter.
    ///
    /// Does nothing when the collection is clean and `force` is false. Otherwise the dirty
    /// flag is cleared and a snapshot is taken before the adapter is called, so mutations
    /// made while the write is in flight are not part of it and leave the collection dirty.
    ///
    /// # Errors
    ///
    /// Adapter failures are returned unchanged. The dirty flag stays cleared; call
    /// `write(true)` to retry.
    pub async fn write(&self, force: bool) -> ShelfResult<()> {
        let Some(snapshot) = self.take_snapshot(force) else {
            log::trace!("Collection {} has no changes to write", self.name);
            return Ok(());
        };

        log::debug!("Writing {} documents from collection {}", snapshot.len(), self.name);

        self.adapter
            .write(snapshot)
            .await
            .inspect_err(|err| log::error!("Failed to write collection {}: {}", self.name, err))
    }

    /// Writes only if there are pending changes. Same as `write(false)`.
    pub async fn flush(&self) -> ShelfResult<()> {
        self.write(false).await
    }

    fn take_snapshot(&self, force: bool) -> Option<Vec<D>> {
        let mut state = self.state.write();

        if !force && !state.dirty {
            return None;
        }

        state.dirty = false;
        Some(state.documents.values().cloned().collect())
    }

    /// Returns a copy of the document set, in document set order.
    pub fn get_documents(&self) -> Vec<D> {
        self.state.read().documents.values().cloned().collect()
    }

    /// Replaces the whole document set and rebuilds every index.
    ///
    /// Documents are expected to have unique primary keys; this bulk path does not reject
    /// duplicates. If two documents share a key, the later one replaces the earlier one at
    /// the earlier one's position, so indexes stay consistent either way. Always marks the
    /// collection dirty.
    pub fn set_documents(&self, documents: impl IntoIterator<Item = D>) {
        let documents = documents.into_iter().collect::<Vec<_>>();
        let mut state = self.state.write();
        let collapsed = state.rebuild(documents, &self.primary_key);
        state.dirty = true;

        if collapsed > 0 {
            log::warn!(
                "Collection {} was given {} documents sharing a primary key; kept the last of each",
                self.name,
                collapsed
            );
        }
    }

    /// Adds a new document.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::DuplicateKey`] if a document with the same primary key exists.
    /// Nothing is modified in that case.
    pub fn create(&self, document: D) -> ShelfResult<()> {
        let key = document.field_or_null(&self.primary_key);
        let mut state = self.state.write();

        if state.documents.contains_key(&key) {
            return Err(ShelfError::DuplicateKey(key.to_string(), self.name.clone()));
        }

        state.index_document(&key, &document);
        state.documents.insert(key, document);
        state.dirty = true;

        Ok(())
    }

    /// Returns the document with the given primary key, if any.
    pub fn find_by_primary_key(&self, key: impl Into<FieldValue>) -> Option<D> {
        self.state.read().documents.get(&key.into()).cloned()
    }

    pub fn contains_key(&self, key: impl Into<FieldValue>) -> bool {
        self.state.read().documents.contains_key(&key.into())
    }

    /// Returns the documents whose `field` equals `value`, in the order they joined that
    /// bucket. An unmatched value yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::UnknownIndex`] if `field` was not registered as indexed.
    pub fn find_by_indexed_field(
        &self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> ShelfResult<Vec<D>> {
        let state = self.state.read();

        let index = state
            .indexes
            .get(field)
            .ok_or_else(|| ShelfError::UnknownIndex(field.to_string(), self.name.clone()))?;

        Ok(index
            .get(&value.into())
            .iter()
            .filter_map(|key| state.documents.get(key).cloned())
            .collect())
    }

    /// Replaces the document with primary key `key`, keeping its position in the document
    /// set and moving it between buckets for every indexed field whose value changed.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::NotFound`] if no document has that key, and
    /// [`ShelfError::ImmutableKey`] if `document` carries a different primary key.
    /// Nothing is modified in either case.
    pub fn update_by_primary_key(
        &self,
        key: impl Into<FieldValue>,
        document: D,
    ) -> ShelfResult<()> {
        self.update_with(key, move |current| *current = document)
    }

    /// Applies `mutate` to a copy of the document with primary key `key`, then stores the
    /// copy and re-indexes it.
    ///
    /// If the closure changes the primary key the copy is discarded and
    /// [`ShelfError::ImmutableKey`] is returned. If it panics the stored document and its
    /// index entries are left as they were.
    ///
    /// # Errors
    ///
    /// Same as [`Collection::update_by_primary_key`].
    pub fn update_with<F>(&self, key: impl Into<FieldValue>, mutate: F) -> ShelfResult<()>
    where
        F: FnOnce(&mut D),
    {
        let key = key.into();
        let mut state = self.state.write();

        self.apply_update(&mut state, &key, mutate)
    }

    /// Merges the top-level fields of a JSON object into the document with primary key
    /// `key`, then re-indexes it like [`Collection::update_by_primary_key`].
    ///
    /// Fields absent from `patch` keep their current value. A patch may repeat the primary
    /// key but not change it.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::Serialization`] if `patch` is not an object or the merged
    /// value no longer deserializes into `D`, plus the errors of
    /// [`Collection::update_by_primary_key`].
    pub fn patch_by_primary_key(
        &self,
        key: impl Into<FieldValue>,
        patch: Value,
    ) -> ShelfResult<()> {
        let Value::Object(patch) = patch else {
            return Err(ShelfError::Serialization(format!(
                "patch for collection {} must be a JSON object",
                self.name
            )));
        };

        let key = key.into();
        let mut state = self.state.write();

        let current = state
            .documents
            .get(&key)
            .ok_or_else(|| ShelfError::NotFound(key.to_string(), self.name.clone()))?;

        let mut merged = current.to_json()?;
        let Value::Object(fields) = &mut merged else {
            return Err(ShelfError::Serialization(format!(
                "documents of collection {} do not serialize to JSON objects",
                self.name
            )));
        };

        fields.extend(patch);
        let patched = D::from_json(merged)?;

        self.apply_update(&mut state, &key, move |current| *current = patched)
    }

    fn apply_update<F>(&self, state: &mut State<D>, key: &FieldValue, mutate: F) -> ShelfResult<()>
    where
        F: FnOnce(&mut D),
    {
        let State {
            documents,
            indexes,
            dirty,
        } = state;

        let document = documents
            .get_mut(key)
            .ok_or_else(|| ShelfError::NotFound(key.to_string(), self.name.clone()))?;

        let mut updated = document.clone();
        mutate(&mut updated);

        let new_key = updated.field_or_null(&self.primary_key);
        if &new_key != key {
            return Err(ShelfError::ImmutableKey(
                key.to_string(),
                new_key.to_string(),
                self.name.clone(),
            ));
        }

        for index in indexes.values_mut() {
            let old_value = document.field_or_null(index.field());
            let new_value = updated.field_or_null(index.field());
            index.relocate(&old_value, new_value, key);
        }

        *document = updated;
        *dirty = true;

        Ok(())
    }

    /// Removes every document whose primary key is in `keys`.
    ///
    /// Accepts a single key or a batch; keys are deduplicated and keys with no document are
    /// ignored. Returns the number of documents removed and marks the collection dirty only
    /// if that number is not zero.
    pub fn delete_by_primary_key(&self, keys: impl Into<KeySet>) -> usize {
        let keys = keys.into();

        if keys.is_empty() {
            return 0;
        }

        let mut state = self.state.write();
        let mut removed = HashSet::new();

        for key in keys {
            let Some(document) = state.documents.get(&key).cloned() else {
                continue;
            };

            state.unindex_document(&key, &document);
            removed.insert(key);
        }

        match removed.len() {
            0 => {}
            1 => {
                for key in &removed {
                    state.documents.shift_remove(key);
                }
            }
            _ => state.documents.retain(|key, _| !removed.contains(key)),
        }

        if !removed.is_empty() {
            state.dirty = true;
        }

        removed.len()
    }

    /// Removes every document. Marks the collection dirty if it was not already empty.
    pub fn clear(&self) {
        let mut state = self.state.write();

        if state.documents.is_empty() {
            return;
        }

        state.documents.clear();
        for index in state.indexes.values_mut() {
            index.clear();
        }
        state.dirty = true;
    }
}

/// Builder for [`Collection`].
///
/// # Example
///
/// ```ignore
/// let tasks = Collection::<Task, _>::builder(adapter)
///     .name("tasks")
///     .primary_key("id")
///     .indexes(["status", "owner"])
///     .build()?;
/// ```
pub struct CollectionBuilder<D: Document, A: Adapter<Vec<D>>> {
    adapter: A,
    name: Option<String>,
    primary_key: Option<String>,
    indexed_fields: Vec<String>,
    _document: PhantomData<fn() -> D>,
}

impl<D: Document, A: Adapter<Vec<D>>> CollectionBuilder<D, A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            name: None,
            primary_key: None,
            indexed_fields: Vec::new(),
            _document: PhantomData,
        }
    }

    /// Sets the name used in log lines and error messages.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the field holding each document's unique identity.
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    /// Registers a field for equality lookups. Repeated fields are registered once.
    pub fn index(mut self, field: impl Into<String>) -> Self {
        self.indexed_fields.push(field.into());
        self
    }

    pub fn indexes<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indexed_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Validates the configuration and creates an empty collection. No I/O happens here.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::Configuration`] if the primary key is missing or unknown to
    /// `D`, if an indexed field is unknown to `D`, or if the primary key field is also
    /// listed as an indexed field.
    pub fn build(self) -> ShelfResult<Collection<D, A>> {
        let name = self.name.unwrap_or_else(|| DEFAULT_NAME.to_string());

        let primary_key = self.primary_key.ok_or_else(|| {
            ShelfError::Configuration(format!("Collection {name} has no primary key field"))
        })?;

        if !D::has_field(&primary_key) {
            return Err(ShelfError::Configuration(format!(
                "Primary key field \"{primary_key}\" is not a field of collection {name}"
            )));
        }

        let mut indexes = IndexMap::new();

        for field in self.indexed_fields {
            if field == primary_key {
                return Err(ShelfError::Configuration(format!(
                    "Primary key field \"{primary_key}\" cannot be indexed in collection {name}"
                )));
            }

            if !D::has_field(&field) {
                return Err(ShelfError::Configuration(format!(
                    "Indexed field \"{field}\" is not a field of collection {name}"
                )));
            }

            indexes
                .entry(field.clone())
                .or_insert_with(|| SecondaryIndex::new(field));
        }

        Ok(Collection {
            name,
            primary_key,
            adapter: self.adapter,
            state: RwLock::new(State {
                documents: IndexMap::new(),
                indexes,
                dirty: false,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedAdapter, Task, init_logging};
    use std::panic::{self, AssertUnwindSafe};

    type Tasks = Collection<Task, ScriptedAdapter<Vec<Task>>>;

    fn tasks() -> Tasks {
        init_logging();

        Collection::builder(ScriptedAdapter::new())
            .name("tasks")
            .primary_key("id")
            .index("status")
            .index("owner")
            .build()
            .unwrap()
    }

    fn ids(documents: Vec<Task>) -> Vec<u64> {
        documents.into_iter().map(|task| task.id).collect()
    }

    /// Every indexed lookup must match a linear scan of the document set.
    fn assert_indexes_consistent(tasks: &Tasks) {
        let documents = tasks.get_documents();
        let mut keys = HashSet::new();

        for document in &documents {
            assert!(keys.insert(document.id), "duplicate primary key {}", document.id);
            assert_eq!(tasks.find_by_primary_key(document.id).as_ref(), Some(document));

            let by_status = tasks.find_by_indexed_field("status", &document.status).unwrap();
            let expected = documents
                .iter()
                .filter(|candidate| candidate.status == document.status)
                .count();
            assert_eq!(by_status.len(), expected);
            assert!(by_status.contains(document));

            let by_owner = tasks
                .find_by_indexed_field("owner", document.owner.clone())
                .unwrap();
            assert!(by_owner.contains(document));
        }
    }

    #[test]
    fn test_build_rejects_indexed_primary_key() {
        let result = Collection::<Task, _>::builder(ScriptedAdapter::new())
            .primary_key("id")
            .indexes(["status", "id"])
            .build();

        assert!(matches!(result, Err(ShelfError::Configuration(_))));
    }

    #[test]
    fn test_build_rejects_unknown_fields() {
        let missing_key = Collection::<Task, _>::builder(ScriptedAdapter::new()).build();
        assert!(matches!(missing_key, Err(ShelfError::Configuration(_))));

        let unknown_key = Collection::<Task, _>::new(ScriptedAdapter::new(), "uuid", ["status"]);
        assert!(matches!(unknown_key, Err(ShelfError::Configuration(_))));

        let unknown_index = Collection::<Task, _>::new(ScriptedAdapter::new(), "id", ["notes"]);
        assert!(matches!(unknown_index, Err(ShelfError::Configuration(_))));
    }

    #[test]
    fn test_build_deduplicates_indexes() {
        let tasks = Collection::<Task, _>::new(
            ScriptedAdapter::new(),
            "id",
            ["status", "owner", "status"],
        )
        .unwrap();

        assert_eq!(tasks.indexed_fields(), vec!["status", "owner"]);
        assert_eq!(tasks.name(), "collection");
        assert!(tasks.is_empty());
        assert!(!tasks.is_dirty());
        assert_eq!(tasks.adapter().writes(), 0);
    }

    #[test]
    fn test_create_indexes_in_creation_order() {
        let tasks = tasks();

        tasks.create(Task::new(1, "open")).unwrap();
        tasks.create(Task::new(2, "open")).unwrap();
        tasks.create(Task::new(3, "closed")).unwrap();

        assert_eq!(ids(tasks.find_by_indexed_field("status", "open").unwrap()), vec![1, 2]);
        assert_eq!(ids(tasks.find_by_indexed_field("status", "closed").unwrap()), vec![3]);
        assert_eq!(
            ids(tasks.find_by_indexed_field("owner", None::<String>).unwrap()),
            vec![1, 2, 3]
        );
        assert!(tasks.is_dirty());
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_create_duplicate_key_leaves_state_intact() {
        let tasks = tasks();

        tasks.create(Task::new(1, "open")).unwrap();
        let err = tasks.create(Task::new(1, "closed")).unwrap_err();

        assert!(matches!(err, ShelfError::DuplicateKey(ref key, _) if key == "1"));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks.find_by_primary_key(1).unwrap().status, "open");
        assert!(tasks.find_by_indexed_field("status", "closed").unwrap().is_empty());
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_find_by_primary_key_absent_is_none() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();

        assert!(tasks.find_by_primary_key(2).is_none());
        assert!(tasks.contains_key(1u8));
        assert!(!tasks.contains_key("1"));
    }

    #[test]
    fn test_find_by_unknown_index_fails() {
        let tasks = tasks();

        let err = tasks.find_by_indexed_field("notes", "x").unwrap_err();
        assert!(matches!(err, ShelfError::UnknownIndex(ref field, _) if field == "notes"));

        let err = tasks.find_by_indexed_field("id", 1).unwrap_err();
        assert!(matches!(err, ShelfError::UnknownIndex(..)));
    }

    #[test]
    fn test_update_moves_between_buckets() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();
        tasks.create(Task::new(2, "open")).unwrap();

        tasks
            .update_by_primary_key(1, Task::new(1, "closed").owned_by("ana"))
            .unwrap();

        assert_eq!(ids(tasks.find_by_indexed_field("status", "open").unwrap()), vec![2]);
        assert_eq!(ids(tasks.find_by_indexed_field("status", "closed").unwrap()), vec![1]);
        assert_eq!(ids(tasks.find_by_indexed_field("owner", "ana").unwrap()), vec![1]);
        assert_eq!(ids(tasks.get_documents()), vec![1, 2]);
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_update_revisiting_value_does_not_duplicate() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();

        for status in ["closed", "open", "closed", "open"] {
            tasks.update_by_primary_key(1, Task::new(1, status)).unwrap();
        }

        assert_eq!(ids(tasks.find_by_indexed_field("status", "open").unwrap()), vec![1]);
        assert!(tasks.find_by_indexed_field("status", "closed").unwrap().is_empty());
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_update_missing_key_fails() {
        let tasks = tasks();

        let err = tasks.update_by_primary_key(9, Task::new(9, "open")).unwrap_err();
        assert!(matches!(err, ShelfError::NotFound(ref key, _) if key == "9"));
        assert!(tasks.is_empty());
        assert!(!tasks.is_dirty());
    }

    #[test]
    fn test_update_key_change_fails_without_changes() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();
        tasks.create(Task::new(2, "open")).unwrap();

        let err = tasks
            .update_by_primary_key(1, Task::new(2, "closed"))
            .unwrap_err();

        assert!(matches!(
            err,
            ShelfError::ImmutableKey(ref from, ref to, _) if from == "1" && to == "2"
        ));
        assert_eq!(tasks.find_by_primary_key(1).unwrap().status, "open");
        assert_eq!(tasks.find_by_primary_key(2).unwrap().status, "open");
        assert!(tasks.find_by_indexed_field("status", "closed").unwrap().is_empty());
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_update_with_panic_leaves_document_and_indexes() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = tasks.update_with(1, |task| {
                task.status = "closed".to_string();
                panic!("interrupted update");
            });
        }));

        assert!(result.is_err());
        assert_eq!(tasks.find_by_primary_key(1).unwrap().status, "open");
        assert_eq!(ids(tasks.find_by_indexed_field("status", "open").unwrap()), vec![1]);
        assert!(tasks.find_by_indexed_field("status", "closed").unwrap().is_empty());
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_update_with_mutates_in_place() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();

        tasks
            .update_with(1, |task| {
                task.status = "review".to_string();
                task.notes.push("looked at it".to_string());
            })
            .unwrap();

        let task = tasks.find_by_primary_key(1).unwrap();
        assert_eq!(task.notes, vec!["looked at it"]);
        assert_eq!(ids(tasks.find_by_indexed_field("status", "review").unwrap()), vec![1]);

        let err = tasks.update_with(1, |task| task.id = 5).unwrap_err();
        assert!(matches!(err, ShelfError::ImmutableKey(..)));
        assert_eq!(tasks.find_by_primary_key(1).unwrap(), task);
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_patch_merges_fields() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open").owned_by("ana")).unwrap();

        tasks
            .patch_by_primary_key(1, serde_json::json!({ "status": "closed" }))
            .unwrap();

        let task = tasks.find_by_primary_key(1).unwrap();
        assert_eq!(task.status, "closed");
        assert_eq!(task.owner.as_deref(), Some("ana"));
        assert_eq!(ids(tasks.find_by_indexed_field("status", "closed").unwrap()), vec![1]);

        let err = tasks
            .patch_by_primary_key(1, serde_json::json!({ "id": 2 }))
            .unwrap_err();
        assert!(matches!(err, ShelfError::ImmutableKey(..)));

        let err = tasks
            .patch_by_primary_key(1, serde_json::json!({ "status": 3 }))
            .unwrap_err();
        assert!(matches!(err, ShelfError::Serialization(_)));

        let err = tasks.patch_by_primary_key(1, serde_json::json!([1])).unwrap_err();
        assert!(matches!(err, ShelfError::Serialization(_)));

        let err = tasks.patch_by_primary_key(7, serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ShelfError::NotFound(..)));
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_delete_batch_ignores_missing_keys() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();
        tasks.create(Task::new(2, "open")).unwrap();

        assert_eq!(tasks.delete_by_primary_key(vec![1, 99, 1]), 1);

        assert!(tasks.find_by_primary_key(1).is_none());
        assert_eq!(ids(tasks.find_by_indexed_field("status", "open").unwrap()), vec![2]);
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_delete_single_and_empty_batch() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();
        tasks.create(Task::new(2, "closed")).unwrap();
        tasks.create(Task::new(3, "open")).unwrap();
        tasks.take_snapshot(false);

        assert_eq!(tasks.delete_by_primary_key(Vec::<u64>::new()), 0);
        assert_eq!(tasks.delete_by_primary_key(42u64), 0);
        assert!(!tasks.is_dirty());

        assert_eq!(tasks.delete_by_primary_key(2u64), 1);
        assert!(tasks.is_dirty());
        assert!(tasks.find_by_indexed_field("status", "closed").unwrap().is_empty());
        assert_eq!(ids(tasks.get_documents()), vec![1, 3]);

        assert_eq!(tasks.delete_by_primary_key([1u64, 3]), 2);
        assert!(tasks.is_empty());
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_set_documents_rebuilds_and_marks_dirty() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();

        tasks.set_documents(vec![Task::new(5, "closed"), Task::new(6, "open")]);

        assert!(tasks.find_by_primary_key(1).is_none());
        assert_eq!(ids(tasks.find_by_indexed_field("status", "open").unwrap()), vec![6]);
        assert!(tasks.is_dirty());
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_set_documents_collapses_duplicate_keys() {
        let tasks = tasks();

        tasks.set_documents(vec![
            Task::new(1, "open"),
            Task::new(2, "open"),
            Task::new(1, "closed"),
        ]);

        assert_eq!(ids(tasks.get_documents()), vec![1, 2]);
        assert_eq!(tasks.find_by_primary_key(1).unwrap().status, "closed");
        assert_eq!(ids(tasks.find_by_indexed_field("status", "open").unwrap()), vec![2]);
        assert_indexes_consistent(&tasks);
    }

    #[test]
    fn test_clear_empties_indexes() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();
        tasks.take_snapshot(false);

        tasks.clear();
        assert!(tasks.is_empty());
        assert!(tasks.is_dirty());
        assert!(tasks.find_by_indexed_field("status", "open").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_absent_loads_empty() {
        let tasks = tasks();

        tasks.read().await.unwrap();

        assert!(tasks.is_empty());
        assert!(!tasks.is_dirty());
    }

    #[tokio::test]
    async fn test_read_rebuilds_indexes_without_dirtying() {
        let adapter = ScriptedAdapter::with_value(vec![
            Task::new(1, "open"),
            Task::new(2, "closed"),
            Task::new(3, "open"),
        ]);
        let tasks = Collection::<Task, _>::new(adapter, "id", ["status"]).unwrap();

        tasks.create(Task::new(7, "open")).unwrap();
        tasks.take_snapshot(false);
        tasks.read().await.unwrap();

        assert!(tasks.find_by_primary_key(7).is_none());
        assert_eq!(ids(tasks.find_by_indexed_field("status", "open").unwrap()), vec![1, 3]);
        assert!(!tasks.is_dirty());
    }

    #[tokio::test]
    async fn test_read_failure_keeps_state() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();
        tasks.adapter().fail_reads();

        let err = tasks.read().await.unwrap_err();
        assert!(matches!(err, ShelfError::Adapter(_)));
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_write_is_skipped_when_clean() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();

        tasks.write(false).await.unwrap();
        tasks.write(false).await.unwrap();
        tasks.flush().await.unwrap();
        assert_eq!(tasks.adapter().writes(), 1);

        tasks.write(true).await.unwrap();
        assert_eq!(tasks.adapter().writes(), 2);
        assert_eq!(tasks.adapter().stored().unwrap(), vec![Task::new(1, "open")]);
    }

    #[tokio::test]
    async fn test_write_failure_clears_dirty_and_force_retries() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();
        tasks.adapter().fail_writes(1);

        assert!(tasks.write(false).await.is_err());
        assert!(!tasks.is_dirty());
        assert!(tasks.adapter().stored().is_none());

        tasks.write(false).await.unwrap();
        assert!(tasks.adapter().stored().is_none());

        tasks.write(true).await.unwrap();
        assert_eq!(tasks.adapter().stored().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_write_then_read_round_trips() {
        let adapter = ScriptedAdapter::new();
        let source = Collection::<Task, _>::new(adapter.clone(), "id", ["status"]).unwrap();

        for id in 0..20u64 {
            let status = if id % 3 == 0 { "open" } else { "closed" };
            source.create(Task::new(id, status)).unwrap();
        }
        source.delete_by_primary_key([4u64, 9]);
        source.update_by_primary_key(5, Task::new(5, "open")).unwrap();
        source.write(false).await.unwrap();

        let copy = Collection::<Task, _>::new(adapter, "id", ["status"]).unwrap();
        copy.read().await.unwrap();

        assert_eq!(copy.get_documents(), source.get_documents());

        let mut copied = ids(copy.find_by_indexed_field("status", "open").unwrap());
        let mut original = ids(source.find_by_indexed_field("status", "open").unwrap());
        copied.sort();
        original.sort();
        assert_eq!(copied, original);
        assert_indexes_consistent(&copy);
    }

    #[tokio::test]
    async fn test_read_builds_one_large_bucket() {
        let stored = (0..50_000u64)
            .map(|id| Task::new(id, "open"))
            .collect::<Vec<_>>();
        let adapter = ScriptedAdapter::with_value(stored);
        let tasks = Collection::<Task, _>::new(adapter, "id", ["status"]).unwrap();

        tasks.read().await.unwrap();

        let open = ids(tasks.find_by_indexed_field("status", "open").unwrap());
        assert_eq!(open.len(), 50_000);
        assert_eq!(open.first(), Some(&0));
        assert_eq!(open.last(), Some(&49_999));
    }

    #[test]
    fn test_mutation_after_snapshot_stays_dirty() {
        let tasks = tasks();
        tasks.create(Task::new(1, "open")).unwrap();

        let snapshot = tasks.take_snapshot(false).unwrap();
        tasks.create(Task::new(2, "open")).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(tasks.is_dirty());
    }
}
