//! Persistence adapter abstraction.
//!
//! An adapter is the only thing a store talks to for durability. It deals in whole values:
//! `write` replaces whatever was stored before, and `read` returns the last written value
//! or `None` when nothing was ever written.
//!
//! # Traits
//!
//! - [`Adapter`]: Whole-value storage for values of type `T`
//! - [`AdapterBuilder`]: Factory trait for creating adapter instances
//!
//! # Example
//!
//! ```ignore
//! use docshelf::adapter::Adapter;
//! use docshelf::memory::Memory;
//!
//! let adapter = Memory::<Vec<u32>>::new();
//! assert_eq!(adapter.read().await?, None);
//!
//! adapter.write(vec![1, 2, 3]).await?;
//! assert_eq!(adapter.read().await?, Some(vec![1, 2, 3]));
//! ```

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

use crate::error::ShelfResult;

/// Abstract whole-value storage backend.
///
/// # Contract
///
/// - `read` returns `Ok(None)` when nothing has been stored yet. It must not fail merely
///   because the storage target does not exist.
/// - `write` atomically replaces the stored value; readers never observe a partial value.
///   If the backend needs a destination that does not exist yet (such as a containing
///   directory) it creates it on first write.
///
/// # Thread Safety
///
/// Implementations are shared between async tasks and must be `Send + Sync`.
#[async_trait]
pub trait Adapter<T>: Send + Sync + Debug
where
    T: Send + 'static,
{
    /// Returns the last successfully written value, or `None` if nothing was written.
    ///
    /// # Errors
    ///
    /// Returns a [`ShelfError`](crate::error::ShelfError) if the backend fails for any
    /// reason other than the value being absent.
    async fn read(&self) -> ShelfResult<Option<T>>;

    /// Stores `value` as the complete replacement of any prior value.
    ///
    /// # Errors
    ///
    /// Returns a [`ShelfError`](crate::error::ShelfError) if the value could not be
    /// persisted. The previously stored value is left intact in that case.
    async fn write(&self, value: T) -> ShelfResult<()>;
}

#[async_trait]
impl<T, A> Adapter<T> for &A
where
    T: Send + 'static,
    A: Adapter<T> + ?Sized,
{
    async fn read(&self) -> ShelfResult<Option<T>> {
        (**self).read().await
    }

    async fn write(&self, value: T) -> ShelfResult<()> {
        (**self).write(value).await
    }
}

#[async_trait]
impl<T, A> Adapter<T> for Arc<A>
where
    T: Send + 'static,
    A: Adapter<T> + ?Sized,
{
    async fn read(&self) -> ShelfResult<Option<T>> {
        (**self).read().await
    }

    async fn write(&self, value: T) -> ShelfResult<()> {
        (**self).write(value).await
    }
}

#[async_trait]
impl<T, A> Adapter<T> for Box<A>
where
    T: Send + 'static,
    A: Adapter<T> + ?Sized,
{
    async fn read(&self) -> ShelfResult<Option<T>> {
        (**self).read().await
    }

    async fn write(&self, value: T) -> ShelfResult<()> {
        (**self).write(value).await
    }
}

/// A type-erased adapter, for choosing the backend at runtime.
pub type DynAdapter<T> = Box<dyn Adapter<T>>;

/// Factory trait for adapters that need asynchronous setup.
#[async_trait]
pub trait AdapterBuilder<T>
where
    T: Send + 'static,
{
    type Adapter: Adapter<T>;

    async fn build(self) -> ShelfResult<Self::Adapter>;
}
