// ABOUTME: Entry point for the rigger CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use rigger::config;
use rigger::error::Result;
use rigger::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);

    if let Err(e) = run(cli, mode).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<()> {
    let output = Output::new(mode);

    match cli.command {
        Commands::Init { project, force } => {
            let path = config::init_config(&env::current_dir()?, project.as_deref(), force)?;
            output.success(&format!("Created {}", path.display()));
            Ok(())
        }
        Commands::Targets { project, identity } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::targets(
                config,
                project.as_deref(),
                commands::identity(identity),
                output,
            )
        }
        Commands::Archive {
            project,
            build,
            status,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::archive(config, &project, build, status, output).await
        }
        Commands::Trigger {
            project,
            build,
            target,
            identity,
            follow,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::trigger(
                config,
                &project,
                build,
                &target,
                commands::identity(identity),
                follow,
                output,
            )
            .await
        }
        Commands::Tail {
            execution,
            offset,
            follow,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::tail(config, &execution, offset, follow, output).await
        }
        Commands::Download {
            execution,
            output: destination,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::download(config, &execution, destination.as_deref(), output).await
        }
        Commands::Compact { execution } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::compact(config, &execution, output).await
        }
    }
}
