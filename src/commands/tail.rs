// ABOUTME: Tail command implementation.
// ABOUTME: Prints an execution's log from a byte offset, polling while it grows.

use rigger::config::Config;
use rigger::error::Result;
use rigger::output::Output;
use rigger::service::DeployService;
use rigger::types::ExecutionId;

pub async fn tail(
    config: Config,
    execution: &str,
    offset: u64,
    follow: bool,
    output: Output,
) -> Result<()> {
    let service = DeployService::from_config(&config)?;
    let id: ExecutionId = execution.parse()?;
    let poll_interval = service.runner().log_settings().poll_interval;

    let mut offset = offset;
    loop {
        let chunk = service.tail_log(&id, offset).await?;
        output.log_bytes(&chunk.bytes)?;
        offset = chunk.next_offset;

        if chunk.complete {
            break;
        }
        if chunk.bytes.is_empty() {
            if !follow {
                tracing::info!("{} is still being written; next offset {}", id, offset);
                break;
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    Ok(())
}
