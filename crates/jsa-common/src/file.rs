//! Whole-file input.
//!
//! Source files are read in one piece into an owned byte buffer; the lexer,
//! spans, and [`Locator`](crate::Locator) all borrow from that buffer.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Failure to read a source file.
#[derive(Debug, Error)]
pub enum ReadFileError {
    #[error("failed to read {}: file not found", path.display())]
    NotFound { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReadFileError {
    /// The path that could not be read.
    pub fn path(&self) -> &Path {
        match self {
            ReadFileError::NotFound { path } | ReadFileError::Io { path, .. } => path,
        }
    }
}

/// Read the entire file at `path`.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, ReadFileError> {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(bytes) => {
            debug!(path = %path.display(), bytes = bytes.len(), "read source file");
            Ok(bytes)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(ReadFileError::NotFound {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ReadFileError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
