//! Stagehand - compile, test, document and package in dependency order

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = stagehand::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
