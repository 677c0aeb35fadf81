// ABOUTME: Execution runner: launches a deploy target's script against its snapshot.
// ABOUTME: Captures stdout and stderr into the execution log and tracks the running flag.

mod context;
mod error;
mod interpreter;
mod record;

pub use context::BuildContext;
pub use error::{DeployError, DeployErrorKind};
pub use interpreter::{Interpreter, ShellConfig};
pub use record::ExecutionRecord;

use bytes::{Bytes, BytesMut};
use snafu::ResultExt;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::diagnostics::{Diagnostics, Warning};
use crate::env::EnvironmentProvider;
use crate::layout::{self, StateLayout};
use crate::log::{LogError, LogSettings, LogSink, LogStore};
use crate::permission::{PermissionCheck, Resource};
use crate::script::{LocalScriptResolver, ScriptResolver, substitute};
use crate::target::DeployTarget;
use crate::types::{BuildRef, Capability, ExecutionId, Identity};

const PUMP_BUFFER: usize = 8 * 1024;
const PUMP_CAPACITY: usize = 64;

/// One triggered run of a deploy target.
#[derive(Debug)]
pub struct Execution {
    id: ExecutionId,
    target: Arc<DeployTarget>,
    build: BuildRef,
    workspace_root: PathBuf,
    log: LogStore,
    running: AtomicBool,
    exit_code: OnceLock<Option<i32>>,
    started_at: DateTime<Utc>,
}

impl Execution {
    fn new(
        id: ExecutionId,
        target: Arc<DeployTarget>,
        build: BuildRef,
        workspace_root: PathBuf,
        log: LogStore,
    ) -> Self {
        Self {
            id,
            target,
            build,
            workspace_root,
            log,
            running: AtomicBool::new(false),
            exit_code: OnceLock::new(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &ExecutionId {
        &self.id
    }

    pub fn target(&self) -> &DeployTarget {
        &self.target
    }

    pub fn build(&self) -> &BuildRef {
        &self.build
    }

    /// Snapshot directory the script runs in.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// True from just before spawn until the process has exited.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Set once the process has exited or failed to launch.
    pub fn is_finished(&self) -> bool {
        self.exit_code.get().is_some()
    }

    /// Exit code of a finished process; `None` while running, after a
    /// failed launch, or when the process was killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code.get().copied().flatten()
    }

    fn mark_running(&self) {
        self.running.store(true, Ordering::Release);
    }

    fn finish(&self, exit_code: Option<i32>) {
        if self.exit_code.set(exit_code).is_err() {
            tracing::debug!("exit code for {} already recorded", self.id);
        }
        self.running.store(false, Ordering::Release);
    }
}

/// Outcome of a finished execution.
#[derive(Debug, Clone)]
pub struct ExitReport {
    pub exit_code: Option<i32>,
    pub log_bytes: u64,
    pub duration: Duration,
    pub warnings: Vec<Warning>,
}

impl ExitReport {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A launched execution and the task supervising it.
#[derive(Debug)]
pub struct ExecutionHandle {
    execution: Arc<Execution>,
    completion: JoinHandle<ExitReport>,
}

impl ExecutionHandle {
    pub fn execution(&self) -> &Arc<Execution> {
        &self.execution
    }

    pub fn id(&self) -> &ExecutionId {
        self.execution.id()
    }

    /// Wait for the script to exit and its output to be sealed.
    pub async fn wait(self) -> Result<ExitReport, DeployError> {
        match self.completion.await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.execution.finish(None);
                Err(DeployError::Supervisor {
                    message: e.to_string(),
                })
            }
        }
    }
}

/// Launches deploy scripts.
///
/// The runner does not serialize executions of the same target; callers
/// must not start a target again while its previous execution is running.
pub struct Runner {
    layout: StateLayout,
    scripts: Arc<dyn ScriptResolver>,
    permissions: Arc<dyn PermissionCheck>,
    environment: Arc<dyn EnvironmentProvider>,
    capability: Capability,
    shell: ShellConfig,
    log_settings: LogSettings,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("layout", &self.layout)
            .field("capability", &self.capability)
            .field("shell", &self.shell)
            .finish()
    }
}

impl Runner {
    pub fn new(
        layout: StateLayout,
        permissions: Arc<dyn PermissionCheck>,
        environment: Arc<dyn EnvironmentProvider>,
    ) -> Self {
        Self {
            layout,
            scripts: Arc::new(LocalScriptResolver),
            permissions,
            environment,
            capability: Capability::trigger(),
            shell: ShellConfig::default(),
            log_settings: LogSettings::default(),
        }
    }

    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptResolver>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capability = capability;
        self
    }

    pub fn with_shell(mut self, shell: ShellConfig) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_log_settings(mut self, settings: LogSettings) -> Self {
        self.log_settings = settings;
        self
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    pub fn log_settings(&self) -> &LogSettings {
        &self.log_settings
    }

    /// Variables available to the target's script for this build.
    pub fn environment_for(
        &self,
        target: &DeployTarget,
        build: &BuildRef,
        workspace_root: &Path,
    ) -> std::collections::HashMap<String, String> {
        BuildContext::new(target, build, workspace_root).layer_over(self.environment.current())
    }

    /// Launch `target`'s script for `build` on behalf of `identity`.
    ///
    /// Returns once the process is spawned. Nothing is created on disk when
    /// the permission check fails or the script cannot be found.
    pub async fn start(
        &self,
        target: Arc<DeployTarget>,
        build: &BuildRef,
        identity: &Identity,
    ) -> Result<ExecutionHandle, DeployError> {
        let resource = Resource {
            project: &build.project,
            build: Some(build.number),
        };
        if !self.permissions.allows(identity, &self.capability, resource) {
            return error::PermissionDeniedSnafu {
                identity: identity.clone(),
                capability: self.capability.clone(),
                project: build.project.clone(),
            }
            .fail();
        }

        let id = layout::execution_id(&target, build);
        let workspace_root = self.layout.archive_dir(&target, build);
        let env = self.environment_for(&target, build, &workspace_root);

        let script_ref = substitute(target.script_ref(), &env);
        let text = self
            .scripts
            .resolve(&script_ref, &workspace_root, &env)
            .await?;
        let interpreter = Interpreter::for_host(&self.shell);

        tracing::info!(
            "evaluating script \"{}\" for {} with {}",
            script_ref,
            id,
            interpreter.program()
        );

        let log = LogStore::new(
            self.layout.log_paths(&id, &target),
            self.log_settings.clone(),
        );
        let execution = Arc::new(Execution::new(
            id.clone(),
            Arc::clone(&target),
            build.clone(),
            workspace_root.clone(),
            log,
        ));
        let record_path = self.layout.record_path(&id);
        let record = ExecutionRecord::started(
            id.clone(),
            target.name().as_str(),
            &script_ref,
            execution.started_at(),
        );
        let sink = self.open_log(&execution, &record, &record_path).await?;

        let launch = Launch {
            execution: &execution,
            interpreter: &interpreter,
            script_ref: &script_ref,
            record_path: &record_path,
        };

        let script = match interpreter.materialize(&workspace_root, &text) {
            Ok(script) => script,
            Err(source) => return Err(launch.abort(sink, record, source).await),
        };

        execution.mark_running();
        let child = match interpreter.command(&script, &workspace_root).spawn() {
            Ok(child) => child,
            Err(source) => {
                drop(script);
                return Err(launch.abort(sink, record, source).await);
            }
        };

        let completion = tokio::spawn(supervise(Supervised {
            child,
            sink,
            script,
            execution: Arc::clone(&execution),
            record,
            record_path,
            diag: Diagnostics::default(),
        }));

        Ok(ExecutionHandle {
            execution,
            completion,
        })
    }

    /// Persist `record` as running, then open the log for writing.
    ///
    /// Readers in other processes trust the record, so it must say running
    /// before the previous log is truncated.
    async fn open_log(
        &self,
        execution: &Execution,
        record: &ExecutionRecord,
        record_path: &Path,
    ) -> Result<LogSink, DeployError> {
        record.save(record_path).await.context(error::RecordSnafu {
            path: record_path.to_path_buf(),
        })?;

        match execution.log().open_for_append().await {
            Ok(sink) => Ok(sink),
            Err(e) => {
                let failed = record.clone().failed(e.to_string());
                if let Err(save) = failed.save(record_path).await {
                    tracing::warn!("failed to write {}: {}", record_path.display(), save);
                }
                Err(e.into())
            }
        }
    }
}

/// State needed to unwind a launch that failed after the log was opened.
struct Launch<'a> {
    execution: &'a Execution,
    interpreter: &'a Interpreter,
    script_ref: &'a str,
    record_path: &'a Path,
}

impl Launch<'_> {
    async fn abort(
        &self,
        mut sink: LogSink,
        record: ExecutionRecord,
        source: std::io::Error,
    ) -> DeployError {
        let message = format!(
            "failed to launch {} for {}: {}",
            self.interpreter.program(),
            self.script_ref,
            source
        );
        tracing::error!("{}: {}", self.execution.id(), message);

        let mut diag = Diagnostics::default();
        if let Err(e) = sink.line(&format!("rigger: {message}")).await {
            diag.warn(Warning::log_write(format!("failed to log launch failure: {e}")));
        }
        if let Err(e) = sink.seal().await {
            diag.warn(Warning::log_write(format!("failed to seal log: {e}")));
        }

        self.execution.finish(None);

        if let Err(e) = record.failed(message).save(self.record_path).await {
            diag.warn(Warning::record(format!(
                "failed to write {}: {}",
                self.record_path.display(),
                e
            )));
        }

        DeployError::Launch {
            interpreter: self.interpreter.program().to_string(),
            script: self.script_ref.to_string(),
            source,
        }
    }
}

struct Supervised {
    child: Child,
    sink: LogSink,
    script: TempPath,
    execution: Arc<Execution>,
    record: ExecutionRecord,
    record_path: PathBuf,
    diag: Diagnostics,
}

async fn supervise(job: Supervised) -> ExitReport {
    let Supervised {
        mut child,
        mut sink,
        script,
        execution,
        record,
        record_path,
        mut diag,
    } = job;
    let started = Instant::now();

    let (tx, rx) = mpsc::channel::<Bytes>(PUMP_CAPACITY);
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump(stderr, tx.clone()));
    }
    drop(tx);

    let (drained, status) = tokio::join!(drain(rx, &mut sink), child.wait());
    if let Err(e) = drained {
        diag.warn(Warning::log_write(format!(
            "output of {} was not fully logged: {}",
            execution.id(),
            e
        )));
    }

    let exit_code = match status {
        Ok(status) => {
            if status.code().is_none()
                && let Err(e) = sink.line("rigger: script terminated by a signal").await
            {
                diag.warn(Warning::log_write(format!("failed to log termination: {e}")));
            }
            status.code()
        }
        Err(e) => {
            diag.warn(Warning::log_write(format!(
                "failed to collect exit status of {}: {}",
                execution.id(),
                e
            )));
            None
        }
    };

    let log_bytes = sink.bytes_written();
    if let Err(e) = sink.seal().await {
        diag.warn(Warning::log_write(format!("failed to seal log: {e}")));
    }

    let script_path = script.to_path_buf();
    if let Err(e) = script.close() {
        diag.warn(Warning::temp_script(format!(
            "failed to remove {}: {}",
            script_path.display(),
            e
        )));
    }

    execution.finish(exit_code);

    if let Err(e) = record.finished(exit_code).save(&record_path).await {
        diag.warn(Warning::record(format!(
            "failed to write {}: {}",
            record_path.display(),
            e
        )));
    }

    tracing::info!(
        "{} finished with exit code {:?} ({} bytes logged)",
        execution.id(),
        exit_code,
        log_bytes
    );

    ExitReport {
        exit_code,
        log_bytes,
        duration: started.elapsed(),
        warnings: diag.into_warnings(),
    }
}

/// Forward one output pipe to the log writer.
async fn pump<R: AsyncRead + Unpin>(mut reader: R, tx: mpsc::Sender<Bytes>) {
    let mut buf = BytesMut::with_capacity(PUMP_BUFFER);
    loop {
        buf.reserve(PUMP_BUFFER);
        match reader.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(buf.split().freeze()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!("failed to read script output: {}", e);
                break;
            }
        }
    }
}

/// Append everything the pumps send; keeps draining after a write error so
/// the child never blocks on a full pipe.
async fn drain(mut rx: mpsc::Receiver<Bytes>, sink: &mut LogSink) -> Result<(), LogError> {
    let mut failure = None;
    while let Some(chunk) = rx.recv().await {
        if failure.is_none()
            && let Err(e) = sink.append_chunk(chunk).await
        {
            failure = Some(e);
        }
    }
    failure.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StaticEnvironment;
    use crate::log::WriterFlag;
    use crate::permission::GrantTable;
    use crate::types::{ProjectName, TargetName};

    fn runner(state: &Path) -> Runner {
        Runner::new(
            StateLayout::new(state),
            Arc::new(GrantTable::new()),
            Arc::new(StaticEnvironment::default()),
        )
    }

    #[tokio::test]
    async fn record_says_running_before_the_log_is_reopened() {
        let state = tempfile::tempdir().unwrap();
        let runner = runner(state.path());
        let target = Arc::new(DeployTarget::new(
            TargetName::new("Docs").unwrap(),
            "docs",
            "run.sh",
            false,
        ));
        let build = BuildRef::new(ProjectName::new("web").unwrap(), 1);
        let id = layout::execution_id(&target, &build);
        let record_path = runner.layout().record_path(&id);
        let paths = runner.layout().log_paths(&id, &target);

        // An earlier run of the same execution finished.
        ExecutionRecord::started(id.clone(), "Docs", "run.sh", Utc::now())
            .finished(Some(0))
            .save(&record_path)
            .await
            .unwrap();

        let execution = Execution::new(
            id.clone(),
            Arc::clone(&target),
            build,
            state.path().to_path_buf(),
            LogStore::new(paths.clone(), LogSettings::default()),
        );
        let record = ExecutionRecord::started(id, "Docs", "run.sh", execution.started_at());
        let mut sink = runner
            .open_log(&execution, &record, &record_path)
            .await
            .unwrap();
        sink.append(b"sec").await.unwrap();

        // A reader in another process only has the record to go by.
        let on_disk = ExecutionRecord::load(&record_path).await.unwrap().unwrap();
        assert!(on_disk.running);
        let reader = LogStore::with_writer(
            paths,
            LogSettings::default(),
            WriterFlag::new(on_disk.running),
        );
        let chunk = reader.read_from(0).await.unwrap();
        assert_eq!(&chunk.bytes[..], b"sec");
        assert!(!chunk.complete);
    }

    #[tokio::test]
    async fn unwritable_record_fails_before_the_log_exists() {
        let state = tempfile::tempdir().unwrap();
        let runner = runner(state.path());
        let target = Arc::new(DeployTarget::new(
            TargetName::new("Docs").unwrap(),
            "docs",
            "run.sh",
            false,
        ));
        let build = BuildRef::new(ProjectName::new("web").unwrap(), 2);
        let id = layout::execution_id(&target, &build);
        let paths = runner.layout().log_paths(&id, &target);

        // A directory where the record file should go.
        let record_path = runner.layout().record_path(&id);
        std::fs::create_dir_all(record_path.join("blocked")).unwrap();

        let execution = Execution::new(
            id.clone(),
            Arc::clone(&target),
            build,
            state.path().to_path_buf(),
            LogStore::new(paths.clone(), LogSettings::default()),
        );
        let record = ExecutionRecord::started(id, "Docs", "run.sh", execution.started_at());
        let err = runner
            .open_log(&execution, &record, &record_path)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Record { .. }));
        assert_eq!(err.kind(), DeployErrorKind::Io);
        assert!(!paths.plain().exists());
    }
}
