// ABOUTME: Plain and compressed log file locations and the storage state they imply.
// ABOUTME: Storage state is a tagged enum so every reader handles all three cases.

use std::path::{Path, PathBuf};

const COMPRESSED_SUFFIX: &str = ".gz";

/// Which artifact currently backs a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    /// Plain text log, growing or sealed.
    Plain,
    /// Gzip copy left by compaction; sealed and read-only.
    Compressed,
    /// Neither file exists; reads as an empty, complete log.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPaths {
    plain: PathBuf,
    compressed: PathBuf,
}

impl LogPaths {
    pub fn new(plain: impl Into<PathBuf>) -> Self {
        let plain = plain.into();
        let mut compressed = plain.clone().into_os_string();
        compressed.push(COMPRESSED_SUFFIX);
        Self {
            plain,
            compressed: PathBuf::from(compressed),
        }
    }

    pub fn plain(&self) -> &Path {
        &self.plain
    }

    pub fn compressed(&self) -> &Path {
        &self.compressed
    }

    pub fn dir(&self) -> Option<&Path> {
        self.plain.parent()
    }

    /// The plain log wins while both exist (compaction removes it last).
    pub async fn state(&self) -> LogState {
        if is_file(&self.plain).await {
            LogState::Plain
        } else if is_file(&self.compressed).await {
            LogState::Compressed
        } else {
            LogState::Absent
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_path_appends_suffix() {
        let paths = LogPaths::new("/logs/run.shlog");
        assert_eq!(paths.compressed(), Path::new("/logs/run.shlog.gz"));
    }

    #[tokio::test]
    async fn state_prefers_plain() {
        let dir = tempfile::tempdir().unwrap();
        let paths = LogPaths::new(dir.path().join("run.shlog"));
        assert_eq!(paths.state().await, LogState::Absent);

        std::fs::write(paths.compressed(), b"").unwrap();
        assert_eq!(paths.state().await, LogState::Compressed);

        std::fs::write(paths.plain(), b"").unwrap();
        assert_eq!(paths.state().await, LogState::Plain);
    }
}
