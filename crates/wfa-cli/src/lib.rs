pub mod cli;

pub use cli::{build_cli_command, BatchArgs, Cli, Commands, OutputFormatArg, RunArgs, SummaryFormat};
