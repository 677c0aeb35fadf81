// ABOUTME: Deploy service: owns projects, their targets and live executions.
// ABOUTME: Archives artifacts, triggers runs and serves logs by execution id.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ProjectConfig};
use crate::diagnostics::{Diagnostics, Warning};
use crate::env::{EnvironmentProvider, LayeredEnvironment, ProcessEnvironment, StaticEnvironment};
use crate::error::{Error, Result};
use crate::layout::{self, StateLayout};
use crate::log::{CompactOutcome, LogChunk, LogStore, LogStream, WriterFlag};
use crate::permission::{GrantTable, PermissionCheck, Resource};
use crate::runner::{DeployError, Execution, ExecutionHandle, ExecutionRecord, Runner};
use crate::script::substitute;
use crate::target::DeployTarget;
use crate::types::{BuildRef, ExecutionId, Identity, ProjectName};
use crate::workspace::{CopyStats, LocalWorkspace, Workspace};

struct Project {
    name: ProjectName,
    workspace: Arc<dyn Workspace>,
    targets: Vec<Arc<DeployTarget>>,
}

impl Project {
    fn target(&self, name: &str) -> Option<&Arc<DeployTarget>> {
        self.targets
            .iter()
            .find(|t| t.name().as_str() == name || t.sanitized_name() == name)
    }
}

/// One target's snapshot from an archive run.
#[derive(Debug, Clone)]
pub struct ArchivedTarget {
    pub target: String,
    pub source: PathBuf,
    pub snapshot: PathBuf,
    pub stats: CopyStats,
}

/// Result of archiving every target of a build.
#[derive(Debug, Clone)]
pub struct ArchiveReport {
    pub build: BuildRef,
    pub targets: Vec<ArchivedTarget>,
    pub warnings: Vec<Warning>,
}

/// Entry point for everything rigger does with deploy targets.
pub struct DeployService {
    projects: Vec<Project>,
    runner: Runner,
    permissions: Arc<dyn PermissionCheck>,
    executions: RwLock<HashMap<ExecutionId, Arc<Execution>>>,
    starting: Mutex<HashSet<ExecutionId>>,
}

struct LaunchClaim<'a> {
    starting: &'a Mutex<HashSet<ExecutionId>>,
    id: ExecutionId,
}

impl Drop for LaunchClaim<'_> {
    fn drop(&mut self) {
        self.starting.lock().remove(&self.id);
    }
}

impl DeployService {
    /// Build the service described by a loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let environment: Arc<dyn EnvironmentProvider> = Arc::new(
            LayeredEnvironment::new()
                .layer(Arc::new(ProcessEnvironment))
                .layer(Arc::new(StaticEnvironment::new(config.resolved_env()?))),
        );
        let permissions: Arc<dyn PermissionCheck> =
            Arc::new(GrantTable::from_map(&config.permissions));

        let runner = Runner::new(
            StateLayout::new(config.state_root()),
            Arc::clone(&permissions),
            Arc::clone(&environment),
        )
        .with_capability(config.capability.clone())
        .with_shell(config.shell.clone())
        .with_log_settings(config.log.clone());

        let mut service = Self::new(runner, permissions);
        for project in &config.projects {
            service = service.with_project(project, config.workspace_root(project));
        }
        Ok(service)
    }

    /// A service with no projects; add them with `with_project`.
    pub fn new(runner: Runner, permissions: Arc<dyn PermissionCheck>) -> Self {
        Self {
            projects: Vec::new(),
            runner,
            permissions,
            executions: RwLock::new(HashMap::new()),
            starting: Mutex::new(HashSet::new()),
        }
    }

    /// Add `project` backed by the local directory `workspace_root`.
    ///
    /// The state directory is hidden from the workspace so earlier
    /// snapshots never match a source pattern.
    pub fn with_project(self, project: &ProjectConfig, workspace_root: PathBuf) -> Self {
        let workspace = LocalWorkspace::new(workspace_root).excluding(self.runner.layout().root());
        self.with_workspace(project, Arc::new(workspace))
    }

    pub fn with_workspace(mut self, project: &ProjectConfig, workspace: Arc<dyn Workspace>) -> Self {
        self.projects.push(Project {
            name: project.name.clone(),
            workspace,
            targets: project.targets.iter().cloned().map(Arc::new).collect(),
        });
        self
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    fn project(&self, name: &ProjectName) -> Result<&Project> {
        self.projects
            .iter()
            .find(|p| &p.name == name)
            .ok_or_else(|| Error::UnknownProject(name.to_string()))
    }

    fn target(&self, project: &ProjectName, name: &str) -> Result<Arc<DeployTarget>> {
        self.project(project)?
            .target(name)
            .cloned()
            .ok_or_else(|| Error::UnknownTarget {
                project: project.to_string(),
                target: name.to_string(),
            })
    }

    pub fn projects(&self) -> impl Iterator<Item = &ProjectName> {
        self.projects.iter().map(|p| &p.name)
    }

    /// The targets configured for `project`, in configuration order.
    pub fn list_targets_for(&self, project: &ProjectName) -> Result<Vec<Arc<DeployTarget>>> {
        Ok(self.project(project)?.targets.clone())
    }

    /// Whether `identity` would be allowed to trigger targets of `project`.
    ///
    /// Only decides what to offer; `trigger` checks again.
    pub fn allowed(&self, identity: &Identity, project: &ProjectName) -> bool {
        self.permissions.allows(
            identity,
            self.runner.capability(),
            Resource {
                project,
                build: None,
            },
        )
    }

    /// Snapshot the artifact directory of every target of `build`.
    pub async fn archive(&self, build: &BuildRef) -> Result<ArchiveReport> {
        let project = self.project(&build.project)?;
        let mut diag = Diagnostics::default();
        let mut targets = Vec::with_capacity(project.targets.len());

        for target in &project.targets {
            let archived = self
                .archive_target(project, target, build, &mut diag)
                .await?;
            tracing::info!(
                "archived {} files ({} bytes) for {} of {}",
                archived.stats.files,
                archived.stats.bytes,
                target.name(),
                build
            );
            targets.push(archived);
        }

        Ok(ArchiveReport {
            build: build.clone(),
            targets,
            warnings: diag.into_warnings(),
        })
    }

    async fn archive_target(
        &self,
        project: &Project,
        target: &DeployTarget,
        build: &BuildRef,
        diag: &mut Diagnostics,
    ) -> Result<ArchivedTarget> {
        let snapshot = self.runner.layout().archive_dir(target, build);
        let env = self.runner.environment_for(target, build, &snapshot);
        let pattern = substitute(target.source_pattern(), &env);

        let matches = project
            .workspace
            .resolve(&pattern)
            .await
            .map_err(DeployError::from)?;
        let source = match matches.as_slice() {
            [] => {
                return Err(DeployError::configuration(format!(
                    "source pattern \"{pattern}\" of {} matched nothing in {}",
                    target.name(),
                    project.workspace.root().display()
                ))
                .into());
            }
            [only] => only.clone(),
            many => {
                let listing: Vec<String> = many
                    .iter()
                    .map(|p| format!("- {}", p.display()))
                    .collect();
                return Err(DeployError::configuration(format!(
                    "more than one path matched \"{pattern}\" for {}:\n{}",
                    target.name(),
                    listing.join("\n")
                ))
                .into());
            }
        };

        if !source.is_dir() {
            return Err(DeployError::configuration(format!(
                "\"{pattern}\" for {} matched {}, which is not a directory",
                target.name(),
                source.display()
            ))
            .into());
        }

        let copied = project.workspace.snapshot_and_copy(&source, &snapshot).await;
        let failure = match copied {
            Ok(stats) if stats.files > 0 => {
                return Ok(ArchivedTarget {
                    target: target.name().to_string(),
                    source,
                    snapshot,
                    stats,
                });
            }
            Ok(_) => {
                let mut message = format!(
                    "directory {} exists but nothing was copied to {}",
                    source.display(),
                    snapshot.display()
                );
                if build.status.is_healthy() {
                    message.push_str("; this is especially strange since the build otherwise succeeded");
                }
                DeployError::Archive { message }
            }
            Err(e) => DeployError::from(e),
        };

        if let Err(e) = tokio::fs::remove_dir_all(&snapshot).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            diag.warn(Warning::snapshot_cleanup(format!(
                "failed to remove partial snapshot {}: {}",
                snapshot.display(),
                e
            )));
        }

        Err(failure.into())
    }

    /// Run `target_name`'s script for `build` on behalf of `identity`.
    pub async fn trigger(
        &self,
        build: &BuildRef,
        target_name: &str,
        identity: &Identity,
    ) -> Result<ExecutionHandle> {
        let target = self.target(&build.project, target_name)?;
        let id = layout::execution_id(&target, build);

        if !self.allowed(identity, &build.project) {
            return Err(DeployError::PermissionDenied {
                identity: identity.clone(),
                capability: self.runner.capability().clone(),
                project: build.project.clone(),
            }
            .into());
        }

        let _claim = self.claim(&id)?;
        let handle = self.runner.start(target, build, identity).await?;
        let mut executions = self.executions.write();
        // Finished runs are served from their records from here on.
        executions.retain(|_, execution| execution.is_running());
        executions.insert(id, Arc::clone(handle.execution()));
        drop(executions);
        Ok(handle)
    }

    /// Reserve `id` for a launch; fails while it is launching or running.
    fn claim(&self, id: &ExecutionId) -> Result<LaunchClaim<'_>> {
        let mut starting = self.starting.lock();
        let running = self
            .executions
            .read()
            .get(id)
            .is_some_and(|e| e.is_running());
        if running || !starting.insert(id.clone()) {
            return Err(DeployError::AlreadyRunning {
                execution: id.clone(),
            }
            .into());
        }
        Ok(LaunchClaim {
            starting: &self.starting,
            id: id.clone(),
        })
    }

    /// The execution for `id`, if this service started it and has not
    /// evicted it since it finished.
    pub fn execution(&self, id: &ExecutionId) -> Option<Arc<Execution>> {
        self.executions.read().get(id).cloned()
    }

    /// The log store for `id`: the live one if this service started the
    /// execution, otherwise one rebuilt from the persisted record.
    async fn store_for(&self, id: &ExecutionId, watch: bool) -> Result<LogStore> {
        if let Some(execution) = self.execution(id) {
            return Ok(execution.log().clone());
        }

        let project = self.project(id.project())?;
        let target = project
            .targets
            .iter()
            .find(|t| t.sanitized_name() == id.target())
            .ok_or_else(|| Error::UnknownTarget {
                project: id.project().to_string(),
                target: id.target().to_string(),
            })?;

        let layout = self.runner.layout();
        let record_path = layout.record_path(id);
        let running = ExecutionRecord::load(&record_path)
            .await?
            .is_some_and(|record| record.running);

        let writer = WriterFlag::new(running);
        let settings = self.runner.log_settings().clone();
        if running && watch {
            watch_remote_writer(record_path, writer.clone(), settings.poll_interval);
        }

        Ok(LogStore::with_writer(
            layout.log_paths(id, target),
            settings,
            writer,
        ))
    }

    /// Bytes of the execution's log from `offset` on.
    pub async fn tail_log(&self, id: &ExecutionId, offset: u64) -> Result<LogChunk> {
        Ok(self.store_for(id, false).await?.read_from(offset).await?)
    }

    /// The whole log as a stream, following it while it grows.
    pub async fn download_log(&self, id: &ExecutionId) -> Result<LogStream> {
        Ok(self.store_for(id, true).await?.open_full_stream())
    }

    /// Gzip a finished execution's log.
    pub async fn compact(&self, id: &ExecutionId) -> Result<CompactOutcome> {
        Ok(self.store_for(id, false).await?.compact().await?)
    }

    /// A log (plain or compressed) exists for `id`.
    pub async fn is_deployed(&self, id: &ExecutionId) -> Result<bool> {
        Ok(self.store_for(id, false).await?.exists().await)
    }
}

/// Clear `writer` once the process running the execution records that it
/// finished. Stops early when no reader holds the flag anymore.
fn watch_remote_writer(record_path: PathBuf, writer: WriterFlag, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            if !writer.is_shared() {
                break;
            }
            match ExecutionRecord::load(&record_path).await {
                Ok(Some(record)) if record.running => continue,
                Ok(_) => {
                    writer.clear();
                    break;
                }
                Err(e) => {
                    tracing::warn!("failed to read {}: {}", record_path.display(), e);
                    writer.clear();
                    break;
                }
            }
        }
    });
}
