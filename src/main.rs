use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use warehousing::cli::{Cli, Commands};
use warehousing::{logging, sim};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbosity());

    // Std stream locks are not held across a run: task threads log to stderr
    // while the main thread waits on them.
    let result = match &cli.command {
        Some(Commands::Bench(args)) => sim::run_bench(args, &mut io::stdout(), &mut io::stderr()),
        None => {
            let stdin = io::stdin();
            if cli.run.input.is_none() && stdin.is_terminal() {
                eprintln!("Provide file path or begin typing deliveries/orders. Use ctrl+D to quit.");
            }
            sim::run_batch(&cli.run, stdin.lock(), &mut io::stdout(), &mut io::stderr())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
