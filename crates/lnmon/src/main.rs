use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lnmon::config::Settings;

mod sub_commands;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Monitor and operate a Lightning node over its gRPC interface
#[derive(Parser)]
#[command(name = "lnmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to working dir
    #[arg(short, long)]
    work_dir: Option<PathBuf>,
    /// Path to config file, defaults to `config.toml` in the working dir
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wallet and channel balances
    Balance,
    /// List channels
    Channels(sub_commands::channels::ChannelsSubCommand),
    /// Create or look up invoices
    Invoice(sub_commands::invoice::InvoiceSubCommand),
    /// Decode a bolt11 payment request
    Decode(sub_commands::decode::DecodeSubCommand),
    /// Pay a bolt11 payment request
    Pay(sub_commands::pay::PaySubCommand),
    /// Print invoice updates as they happen
    Watch(sub_commands::watch::WatchSubCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    let work_dir = lnmon::work_dir(args.work_dir.as_ref())?;

    let config_file = args
        .config
        .clone()
        .unwrap_or_else(|| work_dir.join(CONFIG_FILE_NAME));

    let settings = Settings::new(&config_file)?.from_env();

    let _guard = lnmon::setup_tracing(&work_dir, &settings.logging)?;

    tracing::debug!("Using config file {}", config_file.display());

    let backend = lnmon::backend(&settings.network)?;

    let result = match &args.command {
        Commands::Balance => sub_commands::balance::balance(&backend).await,
        Commands::Channels(sub_command_args) => {
            sub_commands::channels::channels(&backend, sub_command_args).await
        }
        Commands::Invoice(sub_command_args) => {
            sub_commands::invoice::invoice(&backend, sub_command_args).await
        }
        Commands::Decode(sub_command_args) => {
            sub_commands::decode::decode(&backend, sub_command_args).await
        }
        Commands::Pay(sub_command_args) => sub_commands::pay::pay(&backend, sub_command_args).await,
        Commands::Watch(sub_command_args) => {
            sub_commands::watch::watch(&backend, sub_command_args).await
        }
    };

    if let Err(err) = &result {
        tracing::error!(node = %settings.network.name, "Command failed: {err:#}");
    }

    result
}
