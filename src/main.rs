use clap::Parser;
use retsweep::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
