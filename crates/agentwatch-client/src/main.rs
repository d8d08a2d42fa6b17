//! agentwatch: streaming monitor client binary.

use clap::Parser;

use agentwatch_client::{cli, cmd_tail, cmd_watch};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("AGENTWATCH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let command = args
        .command
        .unwrap_or_else(|| cli::Command::Watch(cli::WatchOpts::default()));

    match command {
        cli::Command::Watch(opts) => cmd_watch::cmd_watch(&args.url, opts.interval).await?,
        cli::Command::Tail => cmd_tail::cmd_tail(&args.url).await?,
    }

    Ok(())
}
