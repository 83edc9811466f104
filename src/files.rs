//! Byte-blob file access used by the `/files` handlers.

use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("file not found")]
    NotFound,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Storage for whole files addressed by a single name.
///
/// Names are one path segment; anything that could leave the store
/// (empty, `.`, `..`, or containing a separator) is reported as
/// [`FileError::NotFound`].
pub trait FileStore: Send + Sync + 'static {
    fn read_file(&self, name: &str) -> impl Future<Output = Result<Vec<u8>, FileError>> + Send;

    /// Creates or truncates `name` and writes exactly `data` into it.
    fn write_file(&self, name: &str, data: &[u8])
        -> impl Future<Output = Result<(), FileError>> + Send;

    fn ensure_directory(&self) -> impl Future<Output = Result<(), FileError>> + Send;
}

/// [`FileStore`] rooted at a directory on the local file system.
#[derive(Debug, Clone)]
pub struct LocalFiles {
    root: PathBuf,
}

impl LocalFiles {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, FileError> {
        match name {
            "" | "." | ".." => Err(FileError::NotFound),
            _ if name.contains(['/', '\\']) => Err(FileError::NotFound),
            _ => Ok(self.root.join(name)),
        }
    }
}

impl FileStore for LocalFiles {
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, FileError> {
        let path = self.resolve(name)?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "file does not exist");
                Err(FileError::NotFound)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), FileError> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn ensure_directory(&self) -> Result<(), FileError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }
}
