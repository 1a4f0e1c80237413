//! Registries of named stores with lifecycle fan-out.
//!
//! A [`Registry`] groups collections and single-value stores so an application can load
//! or persist all of them with one call. Calls run concurrently across stores; stores are
//! independent and no cross-store ordering or atomicity is provided.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use docshelf::registry::Registry;
//!
//! let tasks = Arc::new(tasks);
//! let settings = Arc::new(settings);
//!
//! let mut registry = Registry::new();
//! registry.register("tasks", tasks.clone())?;
//! registry.register("settings", settings.clone())?;
//!
//! registry.init().await?;
//! tasks.create(task)?;
//! registry.write().await?;
//! ```

use async_trait::async_trait;
use futures::future::try_join_all;
use indexmap::IndexMap;
use std::{fmt, sync::Arc};

use crate::{
    adapter::Adapter,
    collection::Collection,
    document::Document,
    error::{ShelfError, ShelfResult},
    single::Single,
};

/// Lifecycle shared by every store a [`Registry`] can hold.
#[async_trait]
pub trait Content: Send + Sync {
    /// Loads the store for the first time.
    async fn init(&self) -> ShelfResult<()>;

    /// Reloads the store from its adapter.
    async fn read(&self) -> ShelfResult<()>;

    /// Persists the store.
    async fn write(&self) -> ShelfResult<()>;

    /// Resets the store to its empty or default state and persists that.
    async fn clear(&self) -> ShelfResult<()>;
}

#[async_trait]
impl<D, A> Content for Collection<D, A>
where
    D: Document,
    A: Adapter<Vec<D>>,
{
    async fn init(&self) -> ShelfResult<()> {
        Collection::read(self).await
    }

    async fn read(&self) -> ShelfResult<()> {
        Collection::read(self).await
    }

    async fn write(&self) -> ShelfResult<()> {
        Collection::write(self, false).await
    }

    async fn clear(&self) -> ShelfResult<()> {
        Collection::clear(self);
        Collection::write(self, true).await
    }
}

#[async_trait]
impl<T, A> Content for Single<T, A>
where
    T: Clone + Send + Sync + 'static,
    A: Adapter<T>,
{
    async fn init(&self) -> ShelfResult<()> {
        Single::read(self).await
    }

    async fn read(&self) -> ShelfResult<()> {
        Single::read(self).await
    }

    async fn write(&self) -> ShelfResult<()> {
        Single::write(self).await
    }

    async fn clear(&self) -> ShelfResult<()> {
        Single::clear(self).await
    }
}

/// An ordered set of named stores.
#[derive(Default, Clone)]
pub struct Registry {
    contents: IndexMap<String, Arc<dyn Content>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("contents", &self.contents.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a store under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ShelfError::Configuration`] if the name is already taken.
    pub fn register<C>(&mut self, name: impl Into<String>, content: Arc<C>) -> ShelfResult<()>
    where
        C: Content + 'static,
    {
        let name = name.into();

        if self.contents.contains_key(&name) {
            return Err(ShelfError::Configuration(format!(
                "A store named {name} is already registered"
            )));
        }

        self.contents.insert(name, content);
        Ok(())
    }

    /// Builder-style [`Registry::register`].
    pub fn with<C>(mut self, name: impl Into<String>, content: Arc<C>) -> ShelfResult<Self>
    where
        C: Content + 'static,
    {
        self.register(name, content)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Content>> {
        self.contents.get(name)
    }

    /// Returns the registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.contents.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Initialises every store concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any store.
    pub async fn init(&self) -> ShelfResult<()> {
        log::debug!("Initialising {} stores", self.contents.len());
        try_join_all(self.contents.values().map(|content| content.init())).await?;
        Ok(())
    }

    /// Reloads every store concurrently.
    pub async fn read(&self) -> ShelfResult<()> {
        try_join_all(self.contents.values().map(|content| content.read())).await?;
        Ok(())
    }

    /// Persists every store concurrently. Clean collections skip their write.
    pub async fn write(&self) -> ShelfResult<()> {
        try_join_all(self.contents.values().map(|content| content.write())).await?;
        Ok(())
    }

    /// Clears and persists every store concurrently.
    pub async fn clear(&self) -> ShelfResult<()> {
        try_join_all(self.contents.values().map(|content| content.clear())).await?;
        Ok(())
    }
}
