// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use rigger::types::BuildStatus;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rigger")]
#[command(about = "Run deploy target scripts against build snapshots and tail their logs")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file (default: discovered in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print final results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new rigger.yml configuration file
    Init {
        /// Name of the first project
        #[arg(short, long)]
        project: Option<String>,

        /// Overwrite an existing rigger.yml
        #[arg(long)]
        force: bool,
    },

    /// List deploy targets
    Targets {
        /// Only list targets of this project
        project: Option<String>,

        /// Identity to check trigger permission for
        #[arg(long = "as")]
        identity: Option<String>,
    },

    /// Snapshot every target's artifact directory for a build
    Archive {
        project: String,
        build: u64,

        /// Outcome of the build being archived
        #[arg(long, default_value = "unknown")]
        status: BuildStatus,
    },

    /// Run a deploy target's script against its snapshot
    Trigger {
        project: String,
        build: u64,
        target: String,

        /// Identity to trigger as (default: $USER)
        #[arg(long = "as")]
        identity: Option<String>,

        /// Stream the log until the script exits
        #[arg(short, long)]
        follow: bool,
    },

    /// Print an execution's log from an offset
    Tail {
        /// Execution id: <project>/<build>/<target>
        execution: String,

        /// Byte offset to start from
        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Keep printing until the log is complete
        #[arg(short, long)]
        follow: bool,
    },

    /// Write an execution's whole log to a file or stdout
    Download {
        /// Execution id: <project>/<build>/<target>
        execution: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Gzip a finished execution's log
    Compact {
        /// Execution id: <project>/<build>/<target>
        execution: String,
    },
}
