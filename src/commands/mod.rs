// ABOUTME: Command module aggregator for the rigger CLI.
// ABOUTME: Re-exports command handlers and shared helpers for loading config.

mod archive;
mod compact;
mod download;
mod tail;
mod targets;
mod trigger;

pub use archive::archive;
pub use compact::compact;
pub use download::download;
pub use tail::tail;
pub use targets::targets;
pub use trigger::trigger;

use rigger::config::Config;
use rigger::error::Result;
use rigger::types::Identity;
use std::env;
use std::path::Path;

/// Load the config from `path`, or discover it in the current directory.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(&env::current_dir()?),
    }
}

/// The identity given on the command line, else the invoking user.
pub fn identity(given: Option<String>) -> Identity {
    given
        .or_else(|| env::var("USER").ok())
        .or_else(|| env::var("USERNAME").ok())
        .map(Identity::new)
        .unwrap_or_else(|| Identity::new("anonymous"))
}
