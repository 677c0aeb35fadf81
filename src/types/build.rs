// ABOUTME: Reference to one build of a project, as handed over by the CI side.
// ABOUTME: Carries the build's overall status for archive error reporting.

use super::ProjectName;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Overall result of the build that produced the artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Success,
    Unstable,
    Failure,
    #[default]
    Unknown,
}

impl BuildStatus {
    /// Success or unstable: the build got far enough to produce artifacts.
    pub fn is_healthy(&self) -> bool {
        matches!(self, BuildStatus::Success | BuildStatus::Unstable)
    }
}

impl FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" => Ok(BuildStatus::Success),
            "unstable" => Ok(BuildStatus::Unstable),
            "failure" | "failed" => Ok(BuildStatus::Failure),
            "unknown" => Ok(BuildStatus::Unknown),
            other => Err(format!("unknown build status: {other}")),
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildStatus::Success => "success",
            BuildStatus::Unstable => "unstable",
            BuildStatus::Failure => "failure",
            BuildStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildRef {
    pub project: ProjectName,
    pub number: u64,
    pub status: BuildStatus,
}

impl BuildRef {
    pub fn new(project: ProjectName, number: u64) -> Self {
        Self {
            project,
            number,
            status: BuildStatus::Unknown,
        }
    }

    pub fn with_status(mut self, status: BuildStatus) -> Self {
        self.status = status;
        self
    }
}

impl fmt::Display for BuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.project, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_statuses() {
        assert!(BuildStatus::Success.is_healthy());
        assert!(BuildStatus::Unstable.is_healthy());
        assert!(!BuildStatus::Failure.is_healthy());
        assert!(!BuildStatus::Unknown.is_healthy());
    }

    #[test]
    fn parses_status_case_insensitively() {
        assert_eq!("SUCCESS".parse::<BuildStatus>(), Ok(BuildStatus::Success));
        assert_eq!("failed".parse::<BuildStatus>(), Ok(BuildStatus::Failure));
        assert!("green".parse::<BuildStatus>().is_err());
    }

    #[test]
    fn display_uses_hash_separator() {
        let build = BuildRef::new(ProjectName::new("web").unwrap(), 42);
        assert_eq!(build.to_string(), "web#42");
    }

    #[test]
    fn builds_key_by_status_too() {
        let web = ProjectName::new("web").unwrap();
        let builds: std::collections::HashSet<BuildRef> = [
            BuildRef::new(web.clone(), 1),
            BuildRef::new(web.clone(), 1).with_status(BuildStatus::Success),
            BuildRef::new(web, 1),
        ]
        .into_iter()
        .collect();
        assert_eq!(builds.len(), 2);
    }
}
