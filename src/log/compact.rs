// ABOUTME: Compaction of sealed plain logs into gzip siblings.
// ABOUTME: Writes a partial file, renames it into place, then removes the plain log.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{LogError, LogPaths, LogState};

/// Sizes before and after compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compaction {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactOutcome {
    Compacted(Compaction),
    AlreadyCompressed,
    /// No log exists for this execution.
    Absent,
}

pub(super) async fn compact(paths: &LogPaths) -> Result<CompactOutcome, LogError> {
    match paths.state().await {
        LogState::Compressed => Ok(CompactOutcome::AlreadyCompressed),
        LogState::Absent => Ok(CompactOutcome::Absent),
        LogState::Plain => {
            let plain = paths.plain().to_path_buf();
            let compressed = paths.compressed().to_path_buf();
            let compaction =
                tokio::task::spawn_blocking(move || gzip_in_place(&plain, &compressed)).await??;
            tracing::info!(
                "compacted {} ({} -> {} bytes)",
                paths.plain().display(),
                compaction.original_bytes,
                compaction.compressed_bytes
            );
            Ok(CompactOutcome::Compacted(compaction))
        }
    }
}

fn partial_path(compressed: &Path) -> PathBuf {
    let mut name: OsString = compressed.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn gzip_in_place(plain: &Path, compressed: &Path) -> Result<Compaction, LogError> {
    let partial = partial_path(compressed);

    let result = write_gzip(plain, &partial).and_then(|compaction| {
        // Readers prefer the plain log, so it must go last.
        std::fs::rename(&partial, compressed).map_err(|e| LogError::io(compressed, e))?;
        std::fs::remove_file(plain).map_err(|e| LogError::io(plain, e))?;
        Ok(compaction)
    });

    if result.is_err()
        && let Err(e) = std::fs::remove_file(&partial)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!("failed to remove {}: {}", partial.display(), e);
    }

    result
}

fn write_gzip(plain: &Path, partial: &Path) -> Result<Compaction, LogError> {
    let mut input = File::open(plain).map_err(|e| LogError::io(plain, e))?;
    let output = File::create(partial).map_err(|e| LogError::io(partial, e))?;

    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    let original_bytes =
        std::io::copy(&mut input, &mut encoder).map_err(|e| LogError::io(plain, e))?;

    let mut writer = encoder.finish().map_err(|e| LogError::io(partial, e))?;
    writer.flush().map_err(|e| LogError::io(partial, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| LogError::io(partial, e.into_error()))?;
    file.sync_all().map_err(|e| LogError::io(partial, e))?;

    let compressed_bytes = file
        .metadata()
        .map_err(|e| LogError::io(partial, e))?
        .len();

    Ok(Compaction {
        original_bytes,
        compressed_bytes,
    })
}
