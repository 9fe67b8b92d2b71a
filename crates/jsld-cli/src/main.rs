use std::process::ExitCode;

use clap::Parser;
use jsld_cli::{logging, render_error, run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::set_up_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_error(&err, cli.error_format));
            ExitCode::FAILURE
        }
    }
}
