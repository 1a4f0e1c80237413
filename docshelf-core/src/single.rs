//! Single-value stores.
//!
//! A [`Single`] holds one value with a default and persists it as a whole. Unlike a
//! collection it keeps no indexes and does no change tracking: every write goes through.

use parking_lot::RwLock;
use std::fmt;

use crate::{adapter::Adapter, error::ShelfResult};

/// One value of type `T` backed by an adapter, falling back to a default.
pub struct Single<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: Adapter<T>,
{
    adapter: A,
    default: T,
    value: RwLock<T>,
}

impl<T, A> fmt::Debug for Single<T, A>
where
    T: Clone + Send + Sync + fmt::Debug + 'static,
    A: Adapter<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Single")
            .field("value", &*self.value.read())
            .field("default", &self.default)
            .field("adapter", &self.adapter)
            .finish()
    }
}

impl<T, A> Single<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: Adapter<T>,
{
    /// Creates a store holding `default` until [`Single::read`] is called.
    pub fn new(adapter: A, default: T) -> Self {
        Self {
            adapter,
            value: RwLock::new(default.clone()),
            default,
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Loads the stored value, or the default if nothing was stored.
    pub async fn read(&self) -> ShelfResult<()> {
        let value = self
            .adapter
            .read()
            .await?
            .unwrap_or_else(|| self.default.clone());

        *self.value.write() = value;
        Ok(())
    }

    /// Persists the current value unconditionally.
    pub async fn write(&self) -> ShelfResult<()> {
        let snapshot = self.get();

        self.adapter
            .write(snapshot)
            .await
            .inspect_err(|err| log::error!("Failed to write single value: {}", err))
    }

    /// Resets to the default value and persists it.
    pub async fn clear(&self) -> ShelfResult<()> {
        self.set(self.default.clone());
        self.write().await
    }

    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    pub fn set(&self, value: T) {
        *self.value.write() = value;
    }

    /// Mutates the current value in place.
    pub fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut T),
    {
        mutate(&mut self.value.write());
    }
}
