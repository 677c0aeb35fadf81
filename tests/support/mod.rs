// ABOUTME: Test support utilities.
// ABOUTME: Tracing setup plus builders for workspaces, targets and services.

use rigger::config::ProjectConfig;
use rigger::env::StaticEnvironment;
use rigger::layout::StateLayout;
use rigger::permission::GrantTable;
use rigger::runner::Runner;
use rigger::service::DeployService;
use rigger::target::DeployTarget;
use rigger::types::{Capability, Identity, ProjectName, TargetName};
use std::path::Path;
use std::sync::{Arc, Once};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("rigger=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

#[allow(dead_code)]
pub fn project() -> ProjectName {
    ProjectName::new("web").unwrap()
}

#[allow(dead_code)]
pub fn target(name: &str, source: &str, script: &str, success_only: bool) -> DeployTarget {
    DeployTarget::new(TargetName::new(name).unwrap(), source, script, success_only)
}

#[allow(dead_code)]
pub fn alice() -> Identity {
    Identity::new("alice")
}

/// Grants the trigger capability to alice only.
#[allow(dead_code)]
pub fn grants() -> Arc<GrantTable> {
    Arc::new(GrantTable::new().grant("alice", Capability::trigger()))
}

#[allow(dead_code)]
pub fn runner(state: &Path, env: &[(&str, &str)]) -> Runner {
    let environment: StaticEnvironment = env.iter().copied().collect();
    Runner::new(StateLayout::new(state), grants(), Arc::new(environment))
}

/// A service with one project `web` whose workspace is `workspace`.
#[allow(dead_code)]
pub fn service(
    state: &Path,
    workspace: &Path,
    env: &[(&str, &str)],
    targets: Vec<DeployTarget>,
) -> DeployService {
    let project = ProjectConfig {
        name: project(),
        workspace: workspace.to_path_buf(),
        targets: nonempty::NonEmpty::from_vec(targets).unwrap(),
    };
    DeployService::new(runner(state, env), grants()).with_project(&project, workspace.to_path_buf())
}

/// Write `contents` to `root/relative`, creating parent directories.
#[allow(dead_code)]
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}
