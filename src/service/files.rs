//! Directory-backed file storage for the `/files/{name}` routes.

use std::path::PathBuf;

use tokio::fs::File;
use tokio::io::AsyncReadExt;

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("no base directory configured")]
    NoDirectory,

    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Files under one optional base directory.
///
/// Writes are not coordinated: two concurrent writes to the same name may
/// interleave, and the last one to finish wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: Option<PathBuf>,
    max_file_bytes: u64,
}

impl FileStore {
    pub fn new(root: Option<PathBuf>, max_file_bytes: u64) -> Self {
        Self { root, max_file_bytes }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, FileError> {
        let root = self.root.as_ref().ok_or(FileError::NoDirectory)?;
        Ok(root.join(name))
    }

    /// Reads the whole file, up to the size limit.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, FileError> {
        let path = self.resolve(name)?;
        let file = File::open(&path).await?;

        let mut contents = Vec::new();
        file.take(self.max_file_bytes.saturating_add(1))
            .read_to_end(&mut contents)
            .await?;

        if contents.len() as u64 > self.max_file_bytes {
            return Err(FileError::TooLarge { limit: self.max_file_bytes });
        }

        Ok(contents)
    }

    /// Creates or truncates the file and writes `contents` to it.
    pub async fn write(&self, name: &str, contents: &[u8]) -> Result<(), FileError> {
        let path = self.resolve(name)?;
        tokio::fs::write(&path, contents).await?;
        Ok(())
    }
}
