// ABOUTME: The single append handle for an execution log.
// ABOUTME: Flushes every append and clears the writer flag when sealed or dropped.

use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{LogError, LogPaths};

/// Shared flag that is set while a writer may still append to a log.
#[derive(Debug, Clone, Default)]
pub struct WriterFlag(Arc<AtomicBool>);

impl WriterFlag {
    pub fn new(active: bool) -> Self {
        Self(Arc::new(AtomicBool::new(active)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the writer gone on behalf of a writer in another process.
    pub fn clear(&self) {
        self.release();
    }

    /// Someone besides the caller still holds this flag.
    pub(crate) fn is_shared(&self) -> bool {
        Arc::strong_count(&self.0) > 1
    }

    fn activate(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn release(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Append-only writer for one execution's log.
///
/// Bytes become visible to readers once `append` returns. Sealing (or
/// dropping) the sink clears the writer flag, after which readers may report
/// the log as complete.
#[derive(Debug)]
pub struct LogSink {
    file: File,
    path: PathBuf,
    writer: WriterFlag,
    written: u64,
    released: bool,
}

impl LogSink {
    pub(super) async fn create(paths: &LogPaths, writer: WriterFlag) -> Result<Self, LogError> {
        if let Some(dir) = paths.dir() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| LogError::io(dir, e))?;
        }

        // A compressed log from an earlier run of this execution would
        // otherwise shadow the new one once the plain log is compacted.
        match tokio::fs::remove_file(paths.compressed()).await {
            Ok(()) => tracing::debug!(
                "removed previous compressed log {}",
                paths.compressed().display()
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(LogError::io(paths.compressed(), e)),
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(paths.plain())
            .await
            .map_err(|e| LogError::io(paths.plain(), e))?;

        writer.activate();

        Ok(Self {
            file,
            path: paths.plain().to_path_buf(),
            writer,
            written: 0,
            released: false,
        })
    }

    /// Append raw bytes and flush them to the OS.
    pub async fn append(&mut self, bytes: &[u8]) -> Result<(), LogError> {
        self.file
            .write_all(bytes)
            .await
            .map_err(|e| LogError::io(&self.path, e))?;
        self.file
            .flush()
            .await
            .map_err(|e| LogError::io(&self.path, e))?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub async fn append_chunk(&mut self, chunk: Bytes) -> Result<(), LogError> {
        self.append(&chunk).await
    }

    /// Append a message followed by a newline.
    pub async fn line(&mut self, message: &str) -> Result<(), LogError> {
        let mut buf = Vec::with_capacity(message.len() + 1);
        buf.extend_from_slice(message.as_bytes());
        buf.push(b'\n');
        self.append(&buf).await
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Sync the log to disk and mark it sealed. Returns the total size.
    pub async fn seal(mut self) -> Result<u64, LogError> {
        self.file
            .flush()
            .await
            .map_err(|e| LogError::io(&self.path, e))?;
        self.file
            .sync_data()
            .await
            .map_err(|e| LogError::io(&self.path, e))?;
        self.writer.release();
        self.released = true;
        Ok(self.written)
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        if !self.released {
            self.writer.release();
        }
    }
}
