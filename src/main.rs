//! Frontpipe - command-line entry point

use std::process::ExitCode;

use frontpipe::cli;

fn main() -> ExitCode {
    cli::run()
}
