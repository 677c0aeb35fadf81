// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates rigger.yml template files.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::ProjectName;

use super::CONFIG_FILENAME;

/// Write a starter `rigger.yml` into `dir` and return its path.
pub fn init_config(dir: &Path, project: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let project = match project {
        Some(name) => ProjectName::new(name).map_err(|e| Error::InvalidConfig(e.to_string()))?,
        None => ProjectName::new("my-app").map_err(|e| Error::InvalidConfig(e.to_string()))?,
    };

    std::fs::write(&config_path, generate_template_yaml(&project))?;
    Ok(config_path)
}

fn generate_template_yaml(project: &ProjectName) -> String {
    format!(
        r#"# Where snapshots, logs and execution records are kept.
state_dir: .rigger

# Capability needed to trigger a deploy target.
capability: run.update

permissions:
  "*": [run.update]

# Variables available to ${{VAR}} substitution in deploy scripts.
env:
  STAGE: staging

projects:
  - name: {project}
    workspace: .
    targets:
      - name: Code Coverage
        source: build/coverage
        script: run.sh
        # true keeps one snapshot per build instead of one per project
        success_only: false
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn template_parses() {
        let yaml = generate_template_yaml(&ProjectName::new("web").unwrap());
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.projects.first().name.as_str(), "web");
        assert_eq!(config.resolved_env().unwrap()["STAGE"], "staging");
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config(dir.path(), None, false).unwrap();
        assert!(matches!(
            init_config(dir.path(), None, false),
            Err(Error::AlreadyExists(_))
        ));
        init_config(dir.path(), Some("api"), true).unwrap();
    }
}
