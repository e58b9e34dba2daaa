//! `tcov` command line: argument parsing and the run driver behind
//! `src/main.rs`.

pub mod logging;

use std::fmt;
use std::path::{Path, PathBuf};

use tcov_engine::{EngineConfig, load_snapshot, render_diagnostics};
use tcov_error::TcovError;
use tracing::info;

pub const EXIT_OK: u8 = 0;
pub const EXIT_WARNINGS: u8 = 1;
pub const EXIT_USAGE: u8 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    pub snapshot_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub module_depth: Option<i64>,
    pub output_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub strict: bool,
    pub verbose: bool,
    pub log_json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(CliConfig),
    Help,
}

/// A failed run with the process exit code it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub exit_code: u8,
    pub message: String,
}

impl Failure {
    fn io(message: String) -> Self {
        Self {
            exit_code: 3,
            message,
        }
    }
}

impl From<TcovError> for Failure {
    fn from(error: TcovError) -> Self {
        let message = match error.suggestion() {
            Some(hint) => format!("{error} (hint: {hint})"),
            None => error.to_string(),
        };
        Self {
            exit_code: u8::try_from(error.exit_code()).unwrap_or(EXIT_USAGE),
            message,
        }
    }
}

impl From<tcov_store::StoreError> for Failure {
    fn from(error: tcov_store::StoreError) -> Self {
        Self {
            exit_code: u8::try_from(error.exit_code()).unwrap_or(EXIT_USAGE),
            message: format!("store_write_failed: {error}"),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub const fn usage() -> &'static str {
    "\
tcov - test suite resolution and coverage report

USAGE:
    tcov --snapshot <PATH> [OPTIONS]

OPTIONS:
    --snapshot <PATH>       Project snapshot JSON produced by the reader (required)
    --config <PATH>         Engine configuration TOML
    --module-depth <N>      Folder segments per module bucket (overrides config)
    --output <PATH>         Write JSON report to path (stdout when omitted)
    --db <PATH>             Persist the run into a SQLite store
    --strict                Exit with 1 when the report carries warnings
    --verbose               Debug-level logging
    --log-json              Log JSON lines to stderr
    -h, --help              Show this help

EXIT CODES:
    0 success, 1 warnings with --strict, 2 configuration or usage error,
    3 input/output failure
"
}

fn take_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str, String> {
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut config = CliConfig::default();
    let mut snapshot_path: Option<PathBuf> = None;

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--snapshot" => {
                snapshot_path = Some(PathBuf::from(take_value(args, &mut index, "--snapshot")?));
            }
            "--config" => {
                config.config_path = Some(PathBuf::from(take_value(args, &mut index, "--config")?));
            }
            "--module-depth" => {
                let raw = take_value(args, &mut index, "--module-depth")?;
                let depth = raw
                    .parse::<i64>()
                    .map_err(|_| format!("--module-depth expects an integer, got '{raw}'"))?;
                config.module_depth = Some(depth);
            }
            "--output" => {
                config.output_path = Some(PathBuf::from(take_value(args, &mut index, "--output")?));
            }
            "--db" => {
                config.db_path = Some(PathBuf::from(take_value(args, &mut index, "--db")?));
            }
            "--strict" => config.strict = true,
            "--verbose" => config.verbose = true,
            "--log-json" => config.log_json = true,
            "-h" | "--help" => return Ok(Command::Help),
            unknown => return Err(format!("unknown option: {unknown}")),
        }
        index += 1;
    }

    config.snapshot_path = snapshot_path.ok_or_else(|| "--snapshot is required".to_owned())?;
    Ok(Command::Run(config))
}

fn load_engine_config(config: &CliConfig) -> Result<EngineConfig, TcovError> {
    let mut engine_config = match &config.config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(depth) = config.module_depth {
        engine_config.module_depth = depth;
    }
    Ok(engine_config)
}

fn write_report(payload: &str, output_path: Option<&Path>) -> Result<(), Failure> {
    match output_path {
        Some(path) => std::fs::write(path, payload).map_err(|error| {
            Failure::io(format!(
                "report_write_failed path={} error={error}",
                path.display()
            ))
        }),
        None => {
            println!("{payload}");
            Ok(())
        }
    }
}

/// Run one analysis and return the exit code for a completed run.
pub fn run(config: &CliConfig) -> Result<u8, Failure> {
    let engine_config = load_engine_config(config)?;
    let snapshot = load_snapshot(&config.snapshot_path)?;
    let outcome = tcov_engine::run(&snapshot, &engine_config)?;

    let payload = serde_json::to_string_pretty(&outcome.report)
        .map_err(|error| Failure::io(format!("report_serialize_failed: {error}")))?;
    write_report(&payload, config.output_path.as_deref())?;

    if let Some(db_path) = &config.db_path {
        let mut conn = tcov_store::open(db_path)?;
        let summary = tcov_store::write_run(&mut conn, &outcome.corpus, &outcome.links)?;
        info!(
            path = %db_path.display(),
            test_cases = summary.test_cases,
            case_links = summary.case_links,
            "store updated"
        );
    }

    for line in render_diagnostics(&outcome.report) {
        eprintln!("WARN {line}");
    }
    if config.strict && outcome.report.has_warnings() {
        return Ok(EXIT_WARNINGS);
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn parses_full_flag_set() {
        let command = parse_args(&args(&[
            "--snapshot",
            "snap.json",
            "--config",
            "tcov.toml",
            "--module-depth",
            "3",
            "--output",
            "report.json",
            "--db",
            "tcov.sqlite",
            "--strict",
            "--verbose",
            "--log-json",
        ]))
        .expect("parse args");

        let Command::Run(config) = command else {
            panic!("expected run command");
        };
        assert_eq!(config.snapshot_path, PathBuf::from("snap.json"));
        assert_eq!(config.config_path, Some(PathBuf::from("tcov.toml")));
        assert_eq!(config.module_depth, Some(3));
        assert_eq!(config.output_path, Some(PathBuf::from("report.json")));
        assert_eq!(config.db_path, Some(PathBuf::from("tcov.sqlite")));
        assert!(config.strict && config.verbose && config.log_json);
    }

    #[test]
    fn help_skips_remaining_arguments() {
        assert_eq!(parse_args(&args(&["-h"])), Ok(Command::Help), "case=short");
        assert_eq!(
            parse_args(&args(&["--help", "--bogus-later"])),
            Ok(Command::Help),
            "case=unknown_after_help"
        );
        assert_eq!(
            parse_args(&args(&["--module-depth", "2", "-h"])),
            Ok(Command::Help),
            "case=help_without_snapshot"
        );
    }

    #[test]
    fn arguments_before_help_are_still_validated() {
        assert_eq!(
            parse_args(&args(&["--bogus-earlier", "-h"])).expect_err("unknown first"),
            "unknown option: --bogus-earlier"
        );
    }

    #[test]
    fn usage_errors_are_reported() {
        let cases = [
            (vec![], "--snapshot is required"),
            (vec!["--snapshot"], "--snapshot requires a value"),
            (
                vec!["--snapshot", "s.json", "--module-depth", "two"],
                "--module-depth expects an integer, got 'two'",
            ),
        ];
        for (input, expected) in cases {
            let error = parse_args(&args(&input)).expect_err("must fail");
            assert_eq!(error, expected, "case=args {input:?}");
        }
    }

    #[test]
    fn negative_depth_parses_and_fails_validation_later() {
        let Command::Run(config) =
            parse_args(&args(&["--snapshot", "s.json", "--module-depth", "-1"])).expect("parse")
        else {
            panic!("expected run command");
        };
        let error = load_engine_config(&config)
            .expect("config loads")
            .validate()
            .expect_err("depth -1 is invalid");
        assert_eq!(Failure::from(error).exit_code, EXIT_USAGE);
    }

    #[test]
    fn tcov_errors_map_to_exit_codes() {
        let io = Failure::from(TcovError::Io(std::io::Error::other("disk gone")));
        assert_eq!(io.exit_code, 3);
        let config = Failure::from(TcovError::InvalidModuleDepth { depth: 0 });
        assert_eq!(config.exit_code, 2);
        assert!(config.message.contains("hint:"));
    }
}
