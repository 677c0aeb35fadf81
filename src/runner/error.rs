// ABOUTME: Unified error for archiving and triggering deploy targets, SNAFU style.
// ABOUTME: kind() maps every failure onto the operator-facing taxonomy.

use snafu::Snafu;
use std::path::PathBuf;

use crate::log::LogError;
use crate::script::ScriptError;
use crate::types::{Capability, ExecutionId, Identity, ProjectName};
use crate::workspace::WorkspaceError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DeployError {
    #[snafu(display("configuration error: {message}"))]
    Configuration { message: String },

    #[snafu(display("{identity} lacks the \"{capability}\" capability on {project}"))]
    PermissionDenied {
        identity: Identity,
        capability: Capability,
        project: ProjectName,
    },

    #[snafu(display("{source}"))]
    Script { source: ScriptError },

    #[snafu(display("failed to launch {interpreter} for {script}: {source}"))]
    Launch {
        interpreter: String,
        script: String,
        source: std::io::Error,
    },

    #[snafu(display("{message}"))]
    Archive { message: String },

    #[snafu(display("workspace error: {source}"))]
    Workspace { source: WorkspaceError },

    #[snafu(display("log error: {source}"))]
    Log { source: LogError },

    #[snafu(display("failed to write execution record {}: {source}", path.display()))]
    Record {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{execution} is still running"))]
    AlreadyRunning { execution: ExecutionId },

    #[snafu(display("execution supervisor failed: {message}"))]
    Supervisor { message: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    /// Bad source pattern match, unknown target or similar setup problem.
    Configuration,
    /// The caller lacks the trigger capability.
    PermissionDenied,
    /// The script is missing from the snapshot.
    NotFound,
    /// The interpreter could not be started.
    Launch,
    /// Copy, archive or log I/O failed.
    Io,
    /// The execution is already in progress.
    AlreadyRunning,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Configuration { .. } => DeployErrorKind::Configuration,
            DeployError::PermissionDenied { .. } => DeployErrorKind::PermissionDenied,
            DeployError::Script { source } => match source {
                ScriptError::NotFound { .. } | ScriptError::OutsideWorkspace(_) => {
                    DeployErrorKind::NotFound
                }
                ScriptError::Read { .. } | ScriptError::Task(_) => DeployErrorKind::Io,
            },
            DeployError::Launch { .. } => DeployErrorKind::Launch,
            DeployError::Workspace { source } => match source {
                WorkspaceError::Pattern { .. } => DeployErrorKind::Configuration,
                _ => DeployErrorKind::Io,
            },
            DeployError::Archive { .. }
            | DeployError::Log { .. }
            | DeployError::Record { .. }
            | DeployError::Supervisor { .. } => DeployErrorKind::Io,
            DeployError::AlreadyRunning { .. } => DeployErrorKind::AlreadyRunning,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        DeployError::Configuration {
            message: message.into(),
        }
    }
}

impl From<LogError> for DeployError {
    fn from(source: LogError) -> Self {
        DeployError::Log { source }
    }
}

impl From<ScriptError> for DeployError {
    fn from(source: ScriptError) -> Self {
        DeployError::Script { source }
    }
}

impl From<WorkspaceError> for DeployError {
    fn from(source: WorkspaceError) -> Self {
        DeployError::Workspace { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_script_is_not_found() {
        let err = DeployError::from(ScriptError::NotFound {
            script: "run.sh".to_string(),
            root: PathBuf::from("/ws"),
        });
        assert_eq!(err.kind(), DeployErrorKind::NotFound);
        assert!(err.to_string().contains("run.sh"));
    }

    #[test]
    fn bad_pattern_is_configuration() {
        let err = DeployError::from(WorkspaceError::Pattern {
            pattern: "[".to_string(),
            reason: "unclosed".to_string(),
        });
        assert_eq!(err.kind(), DeployErrorKind::Configuration);
    }

    #[test]
    fn permission_denied_names_capability() {
        let err = DeployError::PermissionDenied {
            identity: Identity::new("bob"),
            capability: Capability::trigger(),
            project: ProjectName::new("web").unwrap(),
        };
        assert_eq!(err.kind(), DeployErrorKind::PermissionDenied);
        assert_eq!(
            err.to_string(),
            "bob lacks the \"run.update\" capability on web"
        );
    }
}
