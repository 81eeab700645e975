//! taskfn - group, sort and filter tasks with single-line expressions

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = taskfn::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
