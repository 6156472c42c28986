use anyhow::Context;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;
use wfa_cli::cli::{Cli, Commands};

mod commands;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default tracing subscriber")?;
    debug!(command = ?cli.command, "starting wfa");

    match &cli.command {
        Commands::Run(args) => commands::run::handle(args),
        Commands::Batch(args) => commands::batch::handle(args),
        Commands::Summary { ledger, format } => commands::summary::handle(ledger, *format),
        Commands::CheckConfig { config } => commands::check_config::handle(config),
    }
}
