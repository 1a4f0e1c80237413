//! Structured file adapters built on [`TextFile`].

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    fmt,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use docshelf_core::{
    adapter::{Adapter, AdapterBuilder},
    error::ShelfResult,
};

use crate::text::TextFile;

/// Converts values to and from the text stored in a [`DataFile`].
pub trait Converter<T>: Send + Sync + fmt::Debug {
    /// Parses the full file content.
    fn parse(&self, text: &str) -> ShelfResult<T>;

    /// Renders a value as the full file content.
    fn stringify(&self, value: &T) -> ShelfResult<String>;
}

/// JSON converter. Pretty-prints with two-space indentation unless made compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonConverter {
    pretty: bool,
}

impl JsonConverter {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonConverter {
    fn default() -> Self {
        Self::pretty()
    }
}

impl<T> Converter<T> for JsonConverter
where
    T: Serialize + DeserializeOwned,
{
    fn parse(&self, text: &str) -> ShelfResult<T> {
        Ok(serde_json::from_str(text)?)
    }

    fn stringify(&self, value: &T) -> ShelfResult<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(value)?)
        } else {
            Ok(serde_json::to_string(value)?)
        }
    }
}

/// Stores a value of type `T` in one file through a [`Converter`].
pub struct DataFile<T, C> {
    file: TextFile,
    converter: C,
    _value: PhantomData<fn() -> T>,
}

/// A [`DataFile`] holding JSON.
pub type JsonFile<T> = DataFile<T, JsonConverter>;

impl<T, C: Clone> Clone for DataFile<T, C> {
    fn clone(&self) -> Self {
        Self {
            file: self.file.clone(),
            converter: self.converter.clone(),
            _value: PhantomData,
        }
    }
}

impl<T, C: fmt::Debug> fmt::Debug for DataFile<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataFile")
            .field("path", &self.file.path())
            .field("converter", &self.converter)
            .finish()
    }
}

impl<T, C: Default> DataFile<T, C> {
    /// Creates an adapter for `path` with the converter's default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_converter(path, C::default())
    }
}

impl<T, C> DataFile<T, C> {
    pub fn with_converter(path: impl Into<PathBuf>, converter: C) -> Self {
        Self {
            file: TextFile::new(path),
            converter,
            _value: PhantomData,
        }
    }

    pub fn builder(path: impl Into<PathBuf>) -> DataFileBuilder<T, C>
    where
        C: Default,
    {
        DataFileBuilder::new(path)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }
}

#[async_trait]
impl<T, C> Adapter<T> for DataFile<T, C>
where
    T: Send + Sync + 'static,
    C: Converter<T>,
{
    async fn read(&self) -> ShelfResult<Option<T>> {
        match self.file.read().await? {
            Some(text) => Ok(Some(self.converter.parse(&text)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, value: T) -> ShelfResult<()> {
        let text = self.converter.stringify(&value)?;
        drop(value);

        log::trace!("Writing {} bytes to {}", text.len(), self.path().display());
        self.file.write(text).await
    }
}

/// Builder for [`DataFile`] adapters.
///
/// # Example
///
/// ```ignore
/// use docshelf::fs::{JsonConverter, JsonFile};
/// use docshelf::adapter::AdapterBuilder;
///
/// let adapter = JsonFile::<Vec<Task>>::builder("data/tasks.json")
///     .converter(JsonConverter::compact())
///     .create_dirs(true)
///     .build()
///     .await?;
/// ```
pub struct DataFileBuilder<T, C> {
    path: PathBuf,
    converter: C,
    create_dirs: bool,
    _value: PhantomData<fn() -> T>,
}

impl<T, C: Default> DataFileBuilder<T, C> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            converter: C::default(),
            create_dirs: false,
            _value: PhantomData,
        }
    }
}

impl<T, C> DataFileBuilder<T, C> {
    pub fn converter(mut self, converter: C) -> Self {
        self.converter = converter;
        self
    }

    /// Creates the parent directory while building instead of on first write.
    pub fn create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = create_dirs;
        self
    }
}

#[async_trait]
impl<T, C> AdapterBuilder<T> for DataFileBuilder<T, C>
where
    T: Send + Sync + 'static,
    C: Converter<T> + 'static,
{
    type Adapter = DataFile<T, C>;

    async fn build(self) -> ShelfResult<Self::Adapter> {
        let adapter = DataFile::with_converter(self.path, self.converter);

        if self.create_dirs {
            adapter.file.create_parent().await?;
        }

        Ok(adapter)
    }
}
