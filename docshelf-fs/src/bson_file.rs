//! Binary BSON file adapter.

use async_trait::async_trait;
use bson::{de::deserialize_from_slice, ser::serialize_to_vec};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fmt,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use docshelf_core::{adapter::Adapter, error::ShelfResult};

use crate::atomic::FileTarget;

/// BSON requires a document at the top level, so values are wrapped before writing.
#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Stores a value of type `T` as a BSON document `{ "data": value }` in one file.
pub struct BsonFile<T> {
    target: FileTarget,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for BsonFile<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            _value: PhantomData,
        }
    }
}

impl<T> fmt::Debug for BsonFile<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BsonFile")
            .field("path", &self.target.path())
            .finish()
    }
}

impl<T> BsonFile<T> {
    /// Creates an adapter for `path`. Nothing is touched on disk until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            target: FileTarget::new(path),
            _value: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        self.target.path()
    }
}

#[async_trait]
impl<T> Adapter<T> for BsonFile<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn read(&self) -> ShelfResult<Option<T>> {
        let Some(bytes) = self.target.read().await? else {
            return Ok(None);
        };

        let envelope: Envelope<T> = deserialize_from_slice(&bytes)?;
        Ok(Some(envelope.data))
    }

    async fn write(&self, value: T) -> ShelfResult<()> {
        let bytes = serialize_to_vec(&EnvelopeRef { data: &value })?;
        drop(value);

        self.target.write(&bytes).await
    }
}
