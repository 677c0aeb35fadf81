// ABOUTME: Error types for the execution log store.
// ABOUTME: Covers file access, decompression and misuse of the writer handle.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot compact {} while it is still being written", path.display())]
    StillWriting { path: PathBuf },

    #[error("log task failed: {0}")]
    Task(String),
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LogError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, LogError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<tokio::task::JoinError> for LogError {
    fn from(err: tokio::task::JoinError) -> Self {
        LogError::Task(err.to_string())
    }
}
