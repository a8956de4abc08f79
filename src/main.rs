use std::process::ExitCode;

use clap::Parser;

use loadspin::cli::{self, CliArgs};

fn main() -> ExitCode {
    loadspin::logger::init();
    let args = CliArgs::parse();
    cli::run(args)
}
