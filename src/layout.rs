// ABOUTME: On-disk layout of snapshots, logs and execution records.
// ABOUTME: Every persisted path rigger uses is derived here.

use crate::log::LogPaths;
use crate::target::{ArchiveScope, DeployTarget};
use crate::types::{BuildRef, ExecutionId, ProjectName};
use std::path::{Path, PathBuf};

pub const RECORD_FILENAME: &str = "execution.json";

/// Root of rigger's persisted state.
///
/// ```text
/// projects/<project>/deployments/<target>/             per-project snapshot
/// projects/<project>/builds/<n>/deployments/<target>/  per-build snapshot
/// projects/<project>/builds/<n>/executions/<target>/   log + execution.json
/// ```
#[derive(Debug, Clone)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project: &ProjectName) -> PathBuf {
        self.root.join("projects").join(project.as_str())
    }

    pub fn build_dir(&self, project: &ProjectName, number: u64) -> PathBuf {
        self.project_dir(project)
            .join("builds")
            .join(number.to_string())
    }

    /// Snapshot directory the target's script runs in.
    pub fn archive_dir(&self, target: &DeployTarget, build: &BuildRef) -> PathBuf {
        let base = match target.archive_scope() {
            ArchiveScope::PerBuild => self.build_dir(&build.project, build.number),
            ArchiveScope::PerProject => self.project_dir(&build.project),
        };
        base.join("deployments").join(target.sanitized_name())
    }

    pub fn execution_dir(&self, id: &ExecutionId) -> PathBuf {
        self.build_dir(id.project(), id.build())
            .join("executions")
            .join(id.target())
    }

    pub fn log_paths(&self, id: &ExecutionId, target: &DeployTarget) -> LogPaths {
        LogPaths::new(self.execution_dir(id).join(target.log_file_name()))
    }

    pub fn record_path(&self, id: &ExecutionId) -> PathBuf {
        self.execution_dir(id).join(RECORD_FILENAME)
    }
}

pub fn execution_id(target: &DeployTarget, build: &BuildRef) -> ExecutionId {
    ExecutionId::new(build.project.clone(), build.number, target.sanitized_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TargetName;

    fn build() -> BuildRef {
        BuildRef::new(ProjectName::new("web").unwrap(), 12)
    }

    fn target(success_only: bool) -> DeployTarget {
        DeployTarget::new(
            TargetName::new("Code Coverage").unwrap(),
            "coverage",
            "run.sh",
            success_only,
        )
    }

    #[test]
    fn per_project_snapshot_ignores_build_number() {
        let layout = StateLayout::new("/state");
        assert_eq!(
            layout.archive_dir(&target(false), &build()),
            PathBuf::from("/state/projects/web/deployments/Code_Coverage")
        );
    }

    #[test]
    fn per_build_snapshot_lives_under_build() {
        let layout = StateLayout::new("/state");
        assert_eq!(
            layout.archive_dir(&target(true), &build()),
            PathBuf::from("/state/projects/web/builds/12/deployments/Code_Coverage")
        );
    }

    #[test]
    fn log_lives_in_execution_dir() {
        let layout = StateLayout::new("/state");
        let id = execution_id(&target(false), &build());
        let paths = layout.log_paths(&id, &target(false));
        assert_eq!(
            paths.plain(),
            Path::new("/state/projects/web/builds/12/executions/Code_Coverage/run.shlog")
        );
        assert_eq!(
            paths.compressed(),
            Path::new("/state/projects/web/builds/12/executions/Code_Coverage/run.shlog.gz")
        );
    }
}
