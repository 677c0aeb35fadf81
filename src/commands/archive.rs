// ABOUTME: Archive command implementation.
// ABOUTME: Snapshots every target's artifact directory for one build.

use rigger::config::Config;
use rigger::error::Result;
use rigger::output::Output;
use rigger::service::DeployService;
use rigger::types::{BuildRef, BuildStatus};

pub async fn archive(
    config: Config,
    project: &str,
    build: u64,
    status: BuildStatus,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let service = DeployService::from_config(&config)?;
    let build = BuildRef::new(config.project(project)?.name.clone(), build).with_status(status);

    output.progress(&format!("Archiving deploy targets of {build}"));
    let report = service.archive(&build).await?;

    for archived in &report.targets {
        output.progress(&format!(
            "  → {}: {} files from {}",
            archived.target,
            archived.stats.files,
            archived.source.display()
        ));
    }
    for warning in &report.warnings {
        output.warning(&warning.message);
    }

    output.success(&format!(
        "Archived {} target(s) for {build}",
        report.targets.len()
    ));
    Ok(())
}
