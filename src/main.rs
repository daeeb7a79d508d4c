//! Tileforge - command-line tool for palette remapping and autotile detection

use std::process::ExitCode;

use tileforge::cli;

fn main() -> ExitCode {
    cli::run()
}
