use std::process::ExitCode;

use clap::Parser;
use colored::*;
use minifs::{cli::Args, logging, shell::start_shell};

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.log_level.into()) {
        eprintln!("failed to install logger: {}", e);
    }

    match start_shell(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "❌ MiniFS failed:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
