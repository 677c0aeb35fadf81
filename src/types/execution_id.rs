// ABOUTME: Stable identifier for one execution of a deploy target.
// ABOUTME: Formed from project, build number and sanitized target name.

use super::ProjectName;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutionIdError {
    #[error("execution id must look like <project>/<build>/<target>: {0}")]
    Malformed(String),

    #[error("invalid build number in execution id: {0}")]
    InvalidBuild(String),

    #[error("invalid project in execution id: {0}")]
    InvalidProject(String),
}

/// `project/build/sanitized-target`, e.g. `web/42/Code_Coverage`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionId {
    project: ProjectName,
    build: u64,
    target: String,
}

impl ExecutionId {
    pub fn new(project: ProjectName, build: u64, sanitized_target: impl Into<String>) -> Self {
        Self {
            project,
            build,
            target: sanitized_target.into(),
        }
    }

    pub fn project(&self) -> &ProjectName {
        &self.project
    }

    pub fn build(&self) -> u64 {
        self.build
    }

    /// The sanitized target name.
    pub fn target(&self) -> &str {
        &self.target
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.build, self.target)
    }
}

impl FromStr for ExecutionId {
    type Err = ExecutionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '/');
        let (Some(project), Some(build), Some(target)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ExecutionIdError::Malformed(s.to_string()));
        };

        if target.is_empty() || target.contains('/') || target.contains(' ') {
            return Err(ExecutionIdError::Malformed(s.to_string()));
        }

        let project =
            ProjectName::new(project).map_err(|e| ExecutionIdError::InvalidProject(e.to_string()))?;
        let build = build
            .parse()
            .map_err(|_| ExecutionIdError::InvalidBuild(build.to_string()))?;

        Ok(Self::new(project, build, target))
    }
}

impl Serialize for ExecutionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ExecutionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let id = ExecutionId::new(ProjectName::new("web").unwrap(), 7, "Code_Coverage");
        assert_eq!(id.to_string(), "web/7/Code_Coverage");
        assert_eq!("web/7/Code_Coverage".parse::<ExecutionId>().unwrap(), id);
    }

    #[test]
    fn rejects_missing_segments() {
        assert!(matches!(
            "web/7".parse::<ExecutionId>(),
            Err(ExecutionIdError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_non_numeric_build() {
        assert!(matches!(
            "web/latest/Docs".parse::<ExecutionId>(),
            Err(ExecutionIdError::InvalidBuild(_))
        ));
    }
}
