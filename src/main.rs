//! Markweave - Markdown to HTML with tables of contents and reference links

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = markweave::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
