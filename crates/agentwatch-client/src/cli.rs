//! CLI definition using clap derive.

use clap::{Parser, Subcommand};

use crate::transport::DEFAULT_STREAM_URL;

#[derive(Parser)]
#[command(name = "agentwatch", about = "live agent activity monitor")]
pub struct Cli {
    /// Event stream endpoint
    #[arg(long, global = true, default_value = DEFAULT_STREAM_URL)]
    pub url: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Live-refresh view of the active agent and current command
    Watch(WatchOpts),
    /// Print accepted events as JSON lines
    Tail,
}

#[derive(clap::Args)]
pub struct WatchOpts {
    /// Fallback redraw interval in seconds
    #[arg(long, default_value = "5")]
    pub interval: u64,
}

impl Default for WatchOpts {
    fn default() -> Self {
        Self { interval: 5 }
    }
}
