// ABOUTME: Application-wide error types for rigger.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::log::LogError;
use crate::runner::DeployError;
use crate::types::ExecutionIdError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown project: {0}")]
    UnknownProject(String),

    #[error("unknown deploy target \"{target}\" in project {project}")]
    UnknownTarget { project: String, target: String },

    #[error("env.{key} needs ${var}, which is not set and has no default")]
    MissingEnvVar { key: String, var: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid execution id: {0}")]
    InvalidExecutionId(#[from] ExecutionIdError),

    #[error("{execution} failed: {status}")]
    ScriptFailed { execution: String, status: String },

    #[error("deploy failed: {0}")]
    Deploy(#[from] DeployError),

    #[error("log error: {0}")]
    Log(#[from] LogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
