// ABOUTME: Execution log store: one writer appends while any number of readers tail.
// ABOUTME: Reads fall back transparently to the gzip copy left by compaction.

mod compact;
mod error;
mod paths;
mod sink;
mod stream;

pub use compact::{CompactOutcome, Compaction};
pub use error::LogError;
pub use paths::{LogPaths, LogState};
pub use sink::{LogSink, WriterFlag};
pub use stream::LogStream;

use bytes::Bytes;
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Tuning for log reads.
#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// Largest number of bytes a single `read_from` returns.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// How long a following stream waits before polling a live log again.
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            poll_interval: default_poll_interval(),
        }
    }
}

/// Result of an incremental read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub bytes: Bytes,
    /// Offset to pass to the next `read_from`.
    pub next_offset: u64,
    /// The log is sealed and nothing exists past `next_offset`.
    pub complete: bool,
}

impl LogChunk {
    fn empty(offset: u64, complete: bool) -> Self {
        Self {
            bytes: Bytes::new(),
            next_offset: offset,
            complete,
        }
    }
}

/// The log of one execution.
///
/// Cloning is cheap; clones share the writer flag, so a reader holding a
/// clone sees the log become sealed as soon as the sink is sealed.
#[derive(Debug, Clone)]
pub struct LogStore {
    paths: LogPaths,
    writer: WriterFlag,
    settings: LogSettings,
}

impl LogStore {
    /// A store with no active writer.
    pub fn new(paths: LogPaths, settings: LogSettings) -> Self {
        Self::with_writer(paths, settings, WriterFlag::default())
    }

    /// A store whose sealed state follows `writer`, e.g. one rebuilt from
    /// a persisted execution record that is still marked running.
    pub fn with_writer(paths: LogPaths, settings: LogSettings, writer: WriterFlag) -> Self {
        Self {
            paths,
            writer,
            settings,
        }
    }

    pub fn paths(&self) -> &LogPaths {
        &self.paths
    }

    pub fn settings(&self) -> &LogSettings {
        &self.settings
    }

    /// Create (truncating) the plain log and hand out its only writer.
    ///
    /// Callers must not open a second sink for the same execution while the
    /// first is alive.
    pub async fn open_for_append(&self) -> Result<LogSink, LogError> {
        LogSink::create(&self.paths, self.writer.clone()).await
    }

    /// No further appends will happen.
    pub fn is_sealed(&self) -> bool {
        !self.writer.is_active()
    }

    pub async fn state(&self) -> LogState {
        self.paths.state().await
    }

    /// True when a plain or compressed log exists.
    pub async fn exists(&self) -> bool {
        self.state().await != LogState::Absent
    }

    /// Return the bytes available at `offset`, at most `chunk_size` of them.
    pub async fn read_from(&self, offset: u64) -> Result<LogChunk, LogError> {
        // Sample the flag before measuring the file: once sealed is seen,
        // every byte the writer flushed is already in the file.
        let sealed = self.is_sealed();
        let limit = self.settings.chunk_size.max(1) as u64;

        // A plain log can be compacted between the state probe and the open;
        // the second pass then finds the compressed copy.
        for _ in 0..2 {
            match self.state().await {
                LogState::Plain => match read_plain(self.paths.plain(), offset, limit).await {
                    Ok((bytes, eof)) => {
                        let next_offset = offset + bytes.len() as u64;
                        return Ok(LogChunk {
                            bytes,
                            next_offset,
                            complete: sealed && eof,
                        });
                    }
                    Err(e) if e.is_not_found() => continue,
                    Err(e) => return Err(e),
                },
                LogState::Compressed => {
                    let path = self.paths.compressed().to_path_buf();
                    let read = tokio::task::spawn_blocking(move || {
                        read_compressed(&path, offset, limit)
                    })
                    .await?;
                    match read {
                        Ok((bytes, eof)) => {
                            let next_offset = offset + bytes.len() as u64;
                            return Ok(LogChunk {
                                bytes,
                                next_offset,
                                complete: eof,
                            });
                        }
                        Err(e) if e.is_not_found() => continue,
                        Err(e) => return Err(e),
                    }
                }
                LogState::Absent => return Ok(LogChunk::empty(offset, true)),
            }
        }

        Ok(LogChunk::empty(offset, true))
    }

    /// Every byte of the log as a forward-only stream.
    ///
    /// A live log is followed until it is sealed; compressed logs are
    /// decompressed on the fly.
    pub fn open_full_stream(&self) -> LogStream {
        stream::full_stream(self.clone())
    }

    /// Replace a sealed plain log with a gzip copy.
    pub async fn compact(&self) -> Result<CompactOutcome, LogError> {
        if !self.is_sealed() {
            return Err(LogError::StillWriting {
                path: self.paths.plain().to_path_buf(),
            });
        }
        compact::compact(&self.paths).await
    }
}

async fn read_plain(path: &Path, offset: u64, limit: u64) -> Result<(Bytes, bool), LogError> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| LogError::io(path, e))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| LogError::io(path, e))?
        .len();

    if offset >= len {
        return Ok((Bytes::new(), true));
    }

    let want = (len - offset).min(limit);
    file.seek(std::io::SeekFrom::Start(offset))
        .await
        .map_err(|e| LogError::io(path, e))?;

    let mut buf = Vec::with_capacity(want as usize);
    file.take(want)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| LogError::io(path, e))?;

    let eof = offset + buf.len() as u64 >= len;
    Ok((Bytes::from(buf), eof))
}

fn read_compressed(path: &Path, offset: u64, limit: u64) -> Result<(Bytes, bool), LogError> {
    let mut decoder = open_decoder(path, offset)?;

    // One byte past the limit tells whether more remains.
    let mut buf = Vec::new();
    (&mut decoder)
        .take(limit + 1)
        .read_to_end(&mut buf)
        .map_err(|e| LogError::io(path, e))?;

    let eof = buf.len() as u64 <= limit;
    buf.truncate(limit as usize);
    Ok((Bytes::from(buf), eof))
}

/// Open a gzip log positioned `skip` bytes into the decompressed stream.
fn open_decoder(path: &Path, skip: u64) -> Result<GzDecoder<BufReader<std::fs::File>>, LogError> {
    let file = std::fs::File::open(path).map_err(|e| LogError::io(path, e))?;
    let mut decoder = GzDecoder::new(BufReader::new(file));
    std::io::copy(&mut (&mut decoder).take(skip), &mut std::io::sink())
        .map_err(|e| LogError::io(path, e))?;
    Ok(decoder)
}
