// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Validates project names and keeps project and target lists non-empty and unique.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::HashSet;

use super::ProjectConfig;
use crate::target::DeployTarget;
use crate::types::ProjectName;

pub fn deserialize_project_name<'de, D>(deserializer: D) -> Result<ProjectName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ProjectName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_projects<'de, D>(deserializer: D) -> Result<NonEmpty<ProjectConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let projects: Vec<ProjectConfig> = Vec::deserialize(deserializer)?;

    let mut seen = HashSet::new();
    for project in &projects {
        if !seen.insert(project.name.as_str()) {
            return Err(serde::de::Error::custom(format!(
                "project \"{}\" is defined more than once",
                project.name
            )));
        }
    }

    NonEmpty::from_vec(projects)
        .ok_or_else(|| serde::de::Error::custom("at least one project is required"))
}

/// Targets share one execution directory per sanitized name, so
/// "Code Coverage" and "Code_Coverage" cannot both exist.
pub fn deserialize_targets<'de, D>(deserializer: D) -> Result<NonEmpty<DeployTarget>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let targets: Vec<DeployTarget> = Vec::deserialize(deserializer)?;

    let mut seen = HashSet::new();
    for target in &targets {
        if !seen.insert(target.sanitized_name()) {
            return Err(serde::de::Error::custom(format!(
                "deploy target \"{}\" clashes with another target of the same project",
                target.name()
            )));
        }
    }

    NonEmpty::from_vec(targets)
        .ok_or_else(|| serde::de::Error::custom("a project needs at least one deploy target"))
}
