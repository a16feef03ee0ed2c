use std::process::ExitCode;

use clap::Parser;
use luahost::cli::{self, CliArgs};
use luahost::logging;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    logging::init(args.debug);

    // `run` has released the interpreter by the time it returns.
    match cli::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", env!("CARGO_PKG_NAME"));
            ExitCode::FAILURE
        }
    }
}
