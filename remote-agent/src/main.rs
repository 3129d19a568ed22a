use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::error;

mod commands;
mod config;
mod logging;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    /// Path to the agent's YAML config file. Missing is fine — every field
    /// has a default and can be overridden through `REMOTE_AGENT__...` env vars.
    #[clap(long, short, default_value = "/etc/remote-agent.yaml")]
    pub config: PathBuf,

    /// Increase log verbosity (-d, -dd).
    #[clap(long, short, action = ArgAction::Count)]
    pub debug: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the agent: HTTP/WebSocket server, mDNS advertiser, command queue.
    Run,
    /// Validate the config file and exit.
    Check,
    /// List paired clients.
    PairStatus,
    /// Revoke a paired client's credential.
    Unpair {
        client_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli)?;

    let result = match &cli.command {
        Commands::Run => commands::run::command(&cli).await,
        Commands::Check => commands::check::command(&cli).await,
        Commands::PairStatus => commands::pair_status::command(&cli).await,
        Commands::Unpair { client_id } => commands::unpair::command(&cli, client_id).await,
    };

    if let Err(error) = &result {
        error!(?error, "fatal error");
    }
    result
}
