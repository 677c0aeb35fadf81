// ABOUTME: Build context variables layered over the configured environment.
// ABOUTME: Gives every deploy script the job, build and target it runs for.

use std::collections::HashMap;
use std::path::Path;

use crate::target::DeployTarget;
use crate::types::BuildRef;

/// Context exposed to macro substitution for one run.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub project: String,
    pub build_number: u64,
    pub target: String,
    pub sanitized_target: String,
    pub workspace: String,
}

impl BuildContext {
    pub fn new(target: &DeployTarget, build: &BuildRef, workspace_root: &Path) -> Self {
        Self {
            project: build.project.to_string(),
            build_number: build.number,
            target: target.name().to_string(),
            sanitized_target: target.sanitized_name(),
            workspace: workspace_root.display().to_string(),
        }
    }

    /// Convert context to environment variables.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("JOB_NAME".to_string(), self.project.clone());
        env.insert("BUILD_NUMBER".to_string(), self.build_number.to_string());
        env.insert("DEPLOY_NAME".to_string(), self.target.clone());
        env.insert(
            "DEPLOY_SANITIZED_NAME".to_string(),
            self.sanitized_target.clone(),
        );
        env.insert("WORKSPACE".to_string(), self.workspace.clone());
        env
    }

    /// `base` with the context variables on top.
    pub fn layer_over(&self, mut base: HashMap<String, String>) -> HashMap<String, String> {
        base.extend(self.to_env());
        base
    }
}
