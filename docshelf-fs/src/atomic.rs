//! Whole-file reads and atomic whole-file replacement.

use mea::mutex::Mutex;
use std::{
    ffi::OsString,
    fmt,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, io::AsyncWriteExt};

use docshelf_core::error::ShelfResult;

/// A file path plus the lock serialising writes to it.
#[derive(Clone)]
pub(crate) struct FileTarget {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl fmt::Debug for FileTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileTarget")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileTarget {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file, mapping a missing file to `None`.
    pub(crate) async fn read(&self) -> ShelfResult<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Atomically replaces the file content, creating the parent directory if missing.
    pub(crate) async fn write(&self, bytes: &[u8]) -> ShelfResult<()> {
        let _guard = self.lock.lock().await;

        match replace(&self.path, bytes).await {
            Err(err) if err.kind() == ErrorKind::NotFound => {
                let Some(parent) = self.parent() else {
                    return Err(err.into());
                };

                log::debug!(
                    "Creating directory {} for {}",
                    parent.display(),
                    self.path.display()
                );

                fs::create_dir_all(parent).await?;
                Ok(replace(&self.path, bytes).await?)
            }
            result => Ok(result?),
        }
    }

    /// Creates the parent directory now instead of on first write.
    pub(crate) async fn create_parent(&self) -> ShelfResult<()> {
        if let Some(parent) = self.parent() {
            fs::create_dir_all(parent).await?;
        }

        Ok(())
    }

    fn parent(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }
}

fn temp_path(path: &Path) -> io::Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} does not name a file", path.display()),
        )
    })?;

    let mut temp = OsString::from(".");
    temp.push(name);
    temp.push(".tmp");

    Ok(path.with_file_name(temp))
}

async fn replace(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp = temp_path(path)?;

    let staged = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        fs::rename(&temp, path).await
    }
    .await;

    if staged.is_err() {
        let _ = fs::remove_file(&temp).await;
    }

    staged
}
