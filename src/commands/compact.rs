// ABOUTME: Compact command implementation.
// ABOUTME: Replaces a finished execution's plain log with its gzip copy.

use rigger::config::Config;
use rigger::error::Result;
use rigger::log::CompactOutcome;
use rigger::output::Output;
use rigger::service::DeployService;
use rigger::types::ExecutionId;

pub async fn compact(config: Config, execution: &str, output: Output) -> Result<()> {
    let service = DeployService::from_config(&config)?;
    let id: ExecutionId = execution.parse()?;

    match service.compact(&id).await? {
        CompactOutcome::Compacted(c) => output.success(&format!(
            "Compacted {id}: {} -> {} bytes",
            c.original_bytes, c.compressed_bytes
        )),
        CompactOutcome::AlreadyCompressed => {
            output.success(&format!("{id} is already compressed"))
        }
        CompactOutcome::Absent => output.warning(&format!("{id} has no log")),
    }
    Ok(())
}
