//! Command-line interface for the `idx` indexing engine.

use std::process::ExitCode;

use clap::Parser;
use idx::{Cli, Command};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Index(args) => idx::run_index(args),
        Command::Config(args) => idx::run_config(args),
    };

    match result {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
