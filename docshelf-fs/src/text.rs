//! Plain text file adapter.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use docshelf_core::{
    adapter::Adapter,
    error::{ShelfError, ShelfResult},
};

use crate::atomic::FileTarget;

/// Stores a `String` as the entire content of one UTF-8 file.
///
/// Clones share the write lock, so writes through any clone are serialised.
#[derive(Debug, Clone)]
pub struct TextFile {
    target: FileTarget,
}

impl TextFile {
    /// Creates an adapter for `path`. Nothing is touched on disk until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            target: FileTarget::new(path),
        }
    }

    pub fn path(&self) -> &Path {
        self.target.path()
    }

    pub(crate) async fn create_parent(&self) -> ShelfResult<()> {
        self.target.create_parent().await
    }
}

#[async_trait]
impl Adapter<String> for TextFile {
    async fn read(&self) -> ShelfResult<Option<String>> {
        let Some(bytes) = self.target.read().await? else {
            return Ok(None);
        };

        String::from_utf8(bytes).map(Some).map_err(|err| {
            ShelfError::Serialization(format!(
                "{} is not valid UTF-8: {}",
                self.path().display(),
                err
            ))
        })
    }

    async fn write(&self, value: String) -> ShelfResult<()> {
        self.target.write(value.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let file = TextFile::new(dir.path().join("notes.txt"));

        assert_eq!(file.read().await.unwrap(), None);

        file.write("line one\nline two".to_string()).await.unwrap();
        assert_eq!(file.read().await.unwrap().as_deref(), Some("line one\nline two"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("binary.txt");
        std::fs::write(&path, [0xff, 0xfe]).unwrap();

        let err = TextFile::new(path).read().await.unwrap_err();
        assert!(matches!(err, ShelfError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_concurrent_writes_leave_one_complete_value() {
        let dir = tempfile::tempdir().unwrap();
        let file = TextFile::new(dir.path().join("race.txt"));
        let other = file.clone();

        let (left, right) = tokio::join!(
            file.write("a".repeat(4096)),
            other.write("b".repeat(4096)),
        );
        left.unwrap();
        right.unwrap();

        let content = file.read().await.unwrap().unwrap();
        assert!(content == "a".repeat(4096) || content == "b".repeat(4096));
    }
}
