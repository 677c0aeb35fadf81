// ABOUTME: Configuration types and parsing for rigger.yml.
// ABOUTME: Handles YAML parsing, discovery, env var interpolation and path resolution.

mod deserialize;
mod env_value;
mod init;

pub use env_value::{EnvValue, resolve_env};
pub use init::init_config;

use crate::error::{Error, Result};
use crate::log::LogSettings;
use crate::runner::ShellConfig;
use crate::target::DeployTarget;
use crate::types::{Capability, ProjectName};
use deserialize::{deserialize_project_name, deserialize_projects, deserialize_targets};
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "rigger.yml";
pub const CONFIG_FILENAME_ALT: &str = "rigger.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".rigger/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where snapshots, logs and execution records live.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Capability required to trigger a target.
    #[serde(default)]
    pub capability: Capability,

    /// Identity to capabilities; `*` applies to everyone.
    #[serde(default)]
    pub permissions: HashMap<String, Vec<Capability>>,

    #[serde(default)]
    pub env: HashMap<String, EnvValue>,

    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub log: LogSettings,

    #[serde(deserialize_with = "deserialize_projects")]
    pub projects: NonEmpty<ProjectConfig>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    #[serde(deserialize_with = "deserialize_project_name")]
    pub name: ProjectName,

    /// Build workspace holding the artifacts to archive.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    #[serde(deserialize_with = "deserialize_targets")]
    pub targets: NonEmpty<DeployTarget>,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".rigger")
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    /// Load a config file; relative paths resolve against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::from_yaml(&content)?.with_base_dir(base))
    }

    /// Find the config in `dir`; relative paths resolve against `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("using config {}", path.display());
                return Ok(Self::load(path)?.with_base_dir(dir));
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn state_root(&self) -> PathBuf {
        self.base_dir.join(&self.state_dir)
    }

    pub fn workspace_root(&self, project: &ProjectConfig) -> PathBuf {
        self.base_dir.join(&project.workspace)
    }

    pub fn project(&self, name: &str) -> Result<&ProjectConfig> {
        self.projects
            .iter()
            .find(|p| p.name.as_str() == name)
            .ok_or_else(|| Error::UnknownProject(name.to_string()))
    }

    /// The configured `env` with every `{ env: VAR }` reference looked up.
    pub fn resolved_env(&self) -> Result<HashMap<String, String>> {
        resolve_env(&self.env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
projects:
  - name: web
    targets:
      - name: Code Coverage
        source: coverage
        script: run.sh
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.state_dir, PathBuf::from(".rigger"));
        assert_eq!(config.capability, Capability::trigger());
        assert_eq!(config.shell, ShellConfig::default());
        assert!(config.permissions.is_empty());

        let project = config.project("web").unwrap();
        assert_eq!(project.workspace, PathBuf::from("."));
        assert_eq!(project.targets.first().name().as_str(), "Code Coverage");
    }

    #[test]
    fn paths_resolve_against_base_dir() {
        let config = Config::from_yaml(MINIMAL)
            .unwrap()
            .with_base_dir("/srv/ci");
        let project = config.project("web").unwrap();
        assert_eq!(config.state_root(), PathBuf::from("/srv/ci/.rigger"));
        assert_eq!(config.workspace_root(project), PathBuf::from("/srv/ci/."));
    }

    #[test]
    fn unknown_project_is_an_error() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert!(matches!(
            config.project("api"),
            Err(Error::UnknownProject(name)) if name == "api"
        ));
    }
}
