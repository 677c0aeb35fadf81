// ABOUTME: Download command implementation.
// ABOUTME: Streams a whole execution log, decompressing if needed, to a file or stdout.

use futures::StreamExt;
use rigger::config::Config;
use rigger::error::Result;
use rigger::output::Output;
use rigger::service::DeployService;
use rigger::types::ExecutionId;
use std::path::Path;
use tokio::io::AsyncWriteExt;

pub async fn download(
    config: Config,
    execution: &str,
    destination: Option<&Path>,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let service = DeployService::from_config(&config)?;
    let id: ExecutionId = execution.parse()?;
    let mut stream = service.download_log(&id).await?;

    let Some(path) = destination else {
        while let Some(chunk) = stream.next().await {
            output.log_bytes(&chunk?)?;
        }
        return Ok(());
    };

    let mut file = tokio::fs::File::create(path).await?;
    let mut total = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        total += chunk.len() as u64;
    }
    file.flush().await?;

    output.success(&format!(
        "Wrote {total} bytes of {id} to {}",
        path.display()
    ));
    Ok(())
}
