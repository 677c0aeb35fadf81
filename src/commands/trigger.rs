// ABOUTME: Trigger command implementation.
// ABOUTME: Launches a deploy target's script and waits for it, optionally streaming its log.

use futures::StreamExt;
use rigger::config::Config;
use rigger::error::{Error, Result};
use rigger::output::Output;
use rigger::service::DeployService;
use rigger::types::{BuildRef, Identity};

pub async fn trigger(
    config: Config,
    project: &str,
    build: u64,
    target: &str,
    identity: Identity,
    follow: bool,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let service = DeployService::from_config(&config)?;
    let build = BuildRef::new(config.project(project)?.name.clone(), build);

    let handle = service.trigger(&build, target, &identity).await?;
    let id = handle.id().clone();
    output.progress(&format!("Triggered {target} for {build} as {identity} ({id})"));

    if follow {
        let mut stream = handle.execution().log().open_full_stream();
        while let Some(chunk) = stream.next().await {
            output.log_bytes(&chunk?)?;
        }
    }

    let report = handle.wait().await?;
    for warning in &report.warnings {
        output.warning(&warning.message);
    }

    match report.exit_code {
        Some(0) => {
            output.success(&format!("{id} finished ({} bytes logged)", report.log_bytes));
            Ok(())
        }
        Some(code) => Err(Error::ScriptFailed {
            execution: id.to_string(),
            status: format!("exit code {code}"),
        }),
        None => Err(Error::ScriptFailed {
            execution: id.to_string(),
            status: "no exit code".to_string(),
        }),
    }
}
