// ABOUTME: Targets command implementation.
// ABOUTME: Lists configured deploy targets and whether the caller may trigger them.

use rigger::config::Config;
use rigger::error::Result;
use rigger::output::Output;
use rigger::service::DeployService;
use rigger::target::ArchiveScope;
use rigger::types::Identity;

pub fn targets(
    config: Config,
    project: Option<&str>,
    identity: Identity,
    output: Output,
) -> Result<()> {
    let service = DeployService::from_config(&config)?;

    let projects = match project {
        Some(name) => vec![config.project(name)?.name.clone()],
        None => service.projects().cloned().collect(),
    };

    for project in &projects {
        let allowed = service.allowed(&identity, project);
        for target in service.list_targets_for(project)? {
            let scope = match target.archive_scope() {
                ArchiveScope::PerBuild => "per build",
                ArchiveScope::PerProject => "per project",
            };
            let mut line = format!(
                "{project}: {} ({} -> {}, {scope})",
                target.name(),
                target.source_pattern(),
                target.script_ref()
            );
            if !allowed {
                line.push_str(&format!(" [{identity} may not trigger]"));
            }
            output.item(&line);
        }
    }

    Ok(())
}
