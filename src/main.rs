use std::process::ExitCode;

use chartsweep::cli::{self, Arguments};
use clap::Parser;

fn main() -> ExitCode {
    let args = Arguments::parse();

    match cli::run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
