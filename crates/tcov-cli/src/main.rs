use std::env;
use std::process::ExitCode;

use tcov_cli::logging::init_logging;
use tcov_cli::{Command, EXIT_USAGE, parse_args, run, usage};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match parse_args(&args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            println!("{}", usage());
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            eprintln!("ERROR {error}");
            eprintln!("{}", usage());
            return ExitCode::from(EXIT_USAGE);
        }
    };

    init_logging(config.verbose, config.log_json);
    match run(&config) {
        Ok(code) => ExitCode::from(code),
        Err(failure) => {
            eprintln!("ERROR tcov failed: {failure}");
            ExitCode::from(failure.exit_code)
        }
    }
}
