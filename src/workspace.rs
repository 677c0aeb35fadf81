// ABOUTME: Build workspace access: pattern resolution and artifact snapshot copies.
// ABOUTME: The local implementation walks the filesystem with the ignore crate.

use async_trait::async_trait;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("invalid source pattern \"{pattern}\": {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("failed to walk {}: {reason}", path.display())]
    Walk { path: PathBuf, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("workspace task failed: {0}")]
    Task(String),
}

impl WorkspaceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        WorkspaceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What a snapshot copy transferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: u64,
    pub bytes: u64,
}

/// A build workspace holding artifacts to snapshot.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Root directory of the workspace.
    fn root(&self) -> &Path;

    /// Every path under the workspace matching `pattern`.
    ///
    /// The caller decides what zero or several matches mean.
    async fn resolve(&self, pattern: &str) -> Result<Vec<PathBuf>, WorkspaceError>;

    /// Replace `dest` with a recursive copy of `source`.
    async fn snapshot_and_copy(
        &self,
        source: &Path,
        dest: &Path,
    ) -> Result<CopyStats, WorkspaceError>;
}

/// A workspace on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalWorkspace {
    root: PathBuf,
    excluded: Vec<PathBuf>,
}

impl LocalWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded: Vec::new(),
        }
    }

    /// Never match or copy anything under `dir`, such as rigger's own state
    /// directory when it lives inside the workspace.
    pub fn excluding(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }
}

#[async_trait]
impl Workspace for LocalWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn resolve(&self, pattern: &str) -> Result<Vec<PathBuf>, WorkspaceError> {
        let root = self.root.clone();
        let excluded = self.excluded.clone();
        let pattern = pattern.to_string();
        tokio::task::spawn_blocking(move || match_pattern(&root, &excluded, &pattern))
            .await
            .map_err(|e| WorkspaceError::Task(e.to_string()))?
    }

    async fn snapshot_and_copy(
        &self,
        source: &Path,
        dest: &Path,
    ) -> Result<CopyStats, WorkspaceError> {
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();
        let excluded = self.excluded.clone();
        tokio::task::spawn_blocking(move || copy_tree(&source, &dest, &excluded))
            .await
            .map_err(|e| WorkspaceError::Task(e.to_string()))?
    }
}

fn walker(root: &Path, excluded: &[PathBuf]) -> ignore::Walk {
    let excluded = excluded.to_vec();
    WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .filter_entry(move |entry| !excluded.iter().any(|dir| same_path(entry.path(), dir)))
        .build()
}

/// Path equality ignoring `.` components, so `./.rigger` and `.rigger` agree.
fn same_path(a: &Path, b: &Path) -> bool {
    fn significant(p: &Path) -> Vec<Component<'_>> {
        p.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect::<Vec<_>>()
    }
    significant(a) == significant(b)
}

fn match_pattern(
    root: &Path,
    excluded: &[PathBuf],
    pattern: &str,
) -> Result<Vec<PathBuf>, WorkspaceError> {
    let invalid = |e: ignore::Error| WorkspaceError::Pattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    };

    let mut builder = OverrideBuilder::new(root);
    builder.add(pattern).map_err(invalid)?;
    let matcher = builder.build().map_err(invalid)?;

    let mut matches = Vec::new();
    for entry in walker(root, excluded) {
        let entry = entry.map_err(|e| WorkspaceError::Walk {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;

        if entry.depth() == 0 {
            continue;
        }

        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if matcher.matched(relative, is_dir).is_whitelist() {
            matches.push(entry.path().to_path_buf());
        }
    }

    matches.sort();
    Ok(matches)
}

fn copy_tree(source: &Path, dest: &Path, excluded: &[PathBuf]) -> Result<CopyStats, WorkspaceError> {
    if dest.exists() {
        std::fs::remove_dir_all(dest).map_err(|e| WorkspaceError::io(dest, e))?;
    }
    std::fs::create_dir_all(dest).map_err(|e| WorkspaceError::io(dest, e))?;

    let mut stats = CopyStats::default();
    for entry in walker(source, excluded) {
        let entry = entry.map_err(|e| WorkspaceError::Walk {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let target = dest.join(relative);
        match entry.file_type() {
            Some(t) if t.is_dir() => {
                std::fs::create_dir_all(&target).map_err(|e| WorkspaceError::io(&target, e))?;
            }
            Some(t) if t.is_file() => {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| WorkspaceError::io(parent, e))?;
                }
                let bytes = std::fs::copy(entry.path(), &target)
                    .map_err(|e| WorkspaceError::io(entry.path(), e))?;
                stats.files += 1;
                stats.bytes += bytes;
            }
            _ => {
                tracing::debug!("skipping non-regular file {}", entry.path().display());
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn resolves_directory_pattern() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("build/coverage")).unwrap();
        fs::create_dir_all(dir.path().join("build/docs")).unwrap();

        let ws = LocalWorkspace::new(dir.path());
        let matches = ws.resolve("build/coverage").await.unwrap();
        assert_eq!(matches, vec![dir.path().join("build/coverage")]);
    }

    #[tokio::test]
    async fn wildcard_pattern_can_match_several() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("out/a")).unwrap();
        fs::create_dir_all(dir.path().join("out/b")).unwrap();

        let ws = LocalWorkspace::new(dir.path());
        let matches = ws.resolve("out/*").await.unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn excluded_directory_is_neither_matched_nor_copied() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("coverage")).unwrap();
        fs::write(dir.path().join("coverage/run.sh"), "true\n").unwrap();
        let state = dir.path().join(".rigger");
        fs::create_dir_all(state.join("projects/web/deployments/coverage")).unwrap();

        let ws = LocalWorkspace::new(dir.path()).excluding(&state);
        let matches = ws.resolve("**/coverage").await.unwrap();
        assert_eq!(matches, vec![dir.path().join("coverage")]);

        let out = tempfile::tempdir().unwrap();
        let dest = out.path().join("copy");
        let stats = ws.snapshot_and_copy(dir.path(), &dest).await.unwrap();
        assert_eq!(stats.files, 1);
        assert!(!dest.join(".rigger").exists());
    }

    #[test]
    fn same_path_ignores_current_dir_components() {
        assert!(same_path(Path::new("./.rigger"), Path::new(".rigger")));
        assert!(same_path(Path::new("/ws/./.rigger"), Path::new("/ws/.rigger")));
        assert!(!same_path(Path::new("/ws/.rigger"), Path::new("/ws/rigger")));
    }

    #[tokio::test]
    async fn copy_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        let dest = dir.path().join("dest");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("run.sh"), "echo hi\n").unwrap();
        fs::write(source.join("nested/data.txt"), "12345").unwrap();
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), "old").unwrap();

        let ws = LocalWorkspace::new(dir.path());
        let stats = ws.snapshot_and_copy(&source, &dest).await.unwrap();

        assert_eq!(stats.files, 2);
        assert_eq!(stats.bytes, 8 + 5);
        assert!(!dest.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(dest.join("nested/data.txt")).unwrap(), "12345");
    }
}
