use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wfa", author, version, about = "Wind farm availability ledger", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute the energy-loss ledger for one month
    Run(RunArgs),
    /// Compute ledgers for a range of months in parallel
    Batch(BatchArgs),
    /// Per-turbine availability from a ledger CSV
    Summary {
        /// Ledger written by `wfa run` or `wfa batch`
        #[arg(value_hint = ValueHint::FilePath)]
        ledger: PathBuf,
        #[arg(long, value_enum, default_value_t = SummaryFormat::Plain)]
        format: SummaryFormat,
    },
    /// Validate an engine configuration and print it with defaults filled in
    CheckConfig {
        #[arg(value_hint = ValueHint::FilePath)]
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Engine configuration (TOML)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: PathBuf,
    /// Directory holding the input CSV tables
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub data: PathBuf,
    /// Reporting month as YYYY-MM
    #[arg(long)]
    pub month: String,
    /// End the period at the latest counter reading (month in progress)
    #[arg(long)]
    pub until_latest: bool,
    /// Output directory
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormatArg::Csv)]
    pub format: OutputFormatArg,
    /// Fail when any row has no potential energy
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug)]
pub struct BatchArgs {
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: PathBuf,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub data: PathBuf,
    /// First month (YYYY-MM)
    #[arg(long)]
    pub from: String,
    /// Last month (YYYY-MM), inclusive
    #[arg(long)]
    pub to: String,
    /// Cut the last month at the latest counter reading
    #[arg(long)]
    pub until_latest: bool,
    #[arg(short, long, value_hint = ValueHint::DirPath)]
    pub out: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormatArg::Csv)]
    pub format: OutputFormatArg,
    /// Worker threads (0 = one per CPU)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormatArg {
    Csv,
    Parquet,
}

impl From<OutputFormatArg> for wfa_batch::OutputFormat {
    fn from(value: OutputFormatArg) -> Self {
        match value {
            OutputFormatArg::Csv => wfa_batch::OutputFormat::Csv,
            OutputFormatArg::Parquet => wfa_batch::OutputFormat::Parquet,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummaryFormat {
    Plain,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
