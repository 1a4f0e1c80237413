//! In-memory adapter implementation.
//!
//! The stored value lives behind an async-aware read-write lock and is shared by every
//! clone of the adapter.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use docshelf_core::{
    adapter::{Adapter, AdapterBuilder},
    error::ShelfResult,
};

/// Thread-safe in-memory adapter.
///
/// Clones share the same stored value, so a clone kept by the caller observes every write
/// made through the adapter handed to a collection.
///
/// Each successful write bumps a revision counter, which makes the adapter handy for
/// asserting how often a store actually persisted.
///
/// # Example
///
/// ```ignore
/// use docshelf_memory::Memory;
/// use docshelf::adapter::Adapter;
///
/// let adapter = Memory::new();
/// adapter.write(vec![1, 2, 3]).await?;
///
/// assert_eq!(adapter.read().await?, Some(vec![1, 2, 3]));
/// assert_eq!(adapter.revision(), 1);
/// ```
pub struct Memory<T> {
    value: Arc<RwLock<Option<T>>>,
    revision: Arc<AtomicU64>,
}

impl<T> Clone for Memory<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            revision: self.revision.clone(),
        }
    }
}

impl<T> Default for Memory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Memory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory")
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

impl<T> Memory<T> {
    /// Creates an empty adapter; the first read returns `None`.
    pub fn new() -> Self {
        Self {
            value: Arc::new(RwLock::new(None)),
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates an adapter that already holds `value`, as if it had been written earlier.
    pub fn with_value(value: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(Some(value))),
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn builder() -> MemoryBuilder<T> {
        MemoryBuilder::default()
    }

    /// Returns the number of successful writes.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}

#[async_trait]
impl<T> Adapter<T> for Memory<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn read(&self) -> ShelfResult<Option<T>> {
        Ok(self.value.read().await.clone())
    }

    async fn write(&self, value: T) -> ShelfResult<()> {
        let mut guard = self.value.write().await;
        *guard = Some(value);

        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!("Memory adapter stored revision {}", revision);

        Ok(())
    }
}

/// Builder for [`Memory`] adapters.
///
/// # Example
///
/// ```ignore
/// use docshelf_memory::Memory;
/// use docshelf::adapter::AdapterBuilder;
///
/// let adapter = Memory::builder().initial(vec![1, 2]).build().await?;
/// ```
pub struct MemoryBuilder<T> {
    initial: Option<T>,
}

impl<T> Default for MemoryBuilder<T> {
    fn default() -> Self {
        Self { initial: None }
    }
}

impl<T> MemoryBuilder<T> {
    /// Pre-seeds the adapter with a stored value.
    pub fn initial(mut self, value: T) -> Self {
        self.initial = Some(value);
        self
    }
}

#[async_trait]
impl<T> AdapterBuilder<T> for MemoryBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Adapter = Memory<T>;

    async fn build(self) -> ShelfResult<Self::Adapter> {
        Ok(match self.initial {
            Some(value) => Memory::with_value(value),
            None => Memory::new(),
        })
    }
}
