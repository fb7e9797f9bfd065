//! Standalone customer management binary.

use std::process::ExitCode;

use clap::Parser;
use subgate_store::cli::{self, CustomerArgs};

fn main() -> ExitCode {
    let args = CustomerArgs::parse();

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
