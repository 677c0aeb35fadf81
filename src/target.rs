// ABOUTME: Deploy target descriptor: a named pairing of artifact directory and script.
// ABOUTME: Immutable once loaded; derives the names used for snapshots and logs.

use crate::types::TargetName;
use serde::Deserialize;
use std::path::Path;

/// Where a target's artifact snapshot lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveScope {
    /// One snapshot per build; older builds keep theirs.
    PerBuild,
    /// One snapshot per project, overwritten by every build.
    PerProject,
}

/// A configured deploy target, such as "Code Coverage" running `run.sh`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTarget")]
pub struct DeployTarget {
    name: TargetName,
    source_pattern: String,
    script_ref: String,
    success_only: bool,
}

impl DeployTarget {
    pub fn new(
        name: TargetName,
        source_pattern: impl Into<String>,
        script_ref: impl Into<String>,
        success_only: bool,
    ) -> Self {
        Self {
            name,
            source_pattern: source_pattern.into(),
            script_ref: canonical_script(&script_ref.into()),
            success_only,
        }
    }

    pub fn name(&self) -> &TargetName {
        &self.name
    }

    /// The name with spaces replaced, safe for paths and URLs.
    pub fn sanitized_name(&self) -> String {
        self.name.sanitized()
    }

    /// Glob locating the artifact directory inside the build workspace.
    pub fn source_pattern(&self) -> &str {
        &self.source_pattern
    }

    /// Script path relative to the snapshot root.
    pub fn script_ref(&self) -> &str {
        &self.script_ref
    }

    pub fn success_only(&self) -> bool {
        self.success_only
    }

    pub fn archive_scope(&self) -> ArchiveScope {
        if self.success_only {
            ArchiveScope::PerBuild
        } else {
            ArchiveScope::PerProject
        }
    }

    /// File name of the plain log: the script's file name plus `log`.
    pub fn log_file_name(&self) -> String {
        let file_name = Path::new(&self.script_ref)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.sanitized_name());
        format!("{file_name}log")
    }
}

/// Older configurations listed several scripts separated by commas; only the
/// first non-blank entry is run.
fn canonical_script(raw: &str) -> String {
    let mut entries = raw.split(',').map(str::trim).filter(|s| !s.is_empty());
    let first = entries.next().unwrap_or_default().to_string();
    if entries.next().is_some() {
        tracing::warn!(
            "script list \"{}\" names several scripts; only \"{}\" will run",
            raw,
            first
        );
    }
    first
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    name: String,
    source: String,
    script: String,
    #[serde(default)]
    success_only: bool,
}

impl TryFrom<RawTarget> for DeployTarget {
    type Error = String;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        let name = TargetName::new(&raw.name).map_err(|e| e.to_string())?;
        if raw.source.trim().is_empty() {
            return Err(format!("deploy target \"{}\" has an empty source", raw.name));
        }
        let target = DeployTarget::new(name, raw.source, raw.script, raw.success_only);
        if target.script_ref.is_empty() {
            return Err(format!("deploy target \"{}\" has no script", raw.name));
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(script: &str, success_only: bool) -> DeployTarget {
        DeployTarget::new(
            TargetName::new("Code Coverage").unwrap(),
            "build/coverage",
            script,
            success_only,
        )
    }

    #[test]
    fn archive_scope_follows_success_only() {
        assert_eq!(target("run.sh", true).archive_scope(), ArchiveScope::PerBuild);
        assert_eq!(
            target("run.sh", false).archive_scope(),
            ArchiveScope::PerProject
        );
    }

    #[test]
    fn log_file_name_uses_script_file_name() {
        assert_eq!(target("run.sh", false).log_file_name(), "run.shlog");
        assert_eq!(target("bin/deploy.sh", false).log_file_name(), "deploy.shlog");
    }

    #[test]
    fn comma_separated_scripts_collapse_to_first() {
        assert_eq!(target(" , deploy.sh, notify.sh", false).script_ref(), "deploy.sh");
    }

    #[test]
    fn deserializes_from_yaml() {
        let yaml = "name: Code Coverage\nsource: build/coverage\nscript: run.sh\n";
        let target: DeployTarget = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(target.sanitized_name(), "Code_Coverage");
        assert!(!target.success_only());
    }

    #[test]
    fn empty_name_fails_to_deserialize() {
        let yaml = "name: ''\nsource: build\nscript: run.sh\n";
        assert!(serde_yaml::from_str::<DeployTarget>(yaml).is_err());
    }
}
