// This software is released under the MIT license.
// See file LICENSE for full license details.
use std::process::ExitCode;

use clap::Parser;
use inseq::command::Commands;
use inseq::runtime::{setup_global_logger, LogLevel};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[arg(long = "log-level", global = true, default_value = "info")]
    /// trace, debug, info, warn, error or off. RUST_LOG takes precedence
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let mut cli = Cli::parse();
    setup_global_logger(cli.log_level);

    if let Err(e) = cli.command.try_execute() {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
