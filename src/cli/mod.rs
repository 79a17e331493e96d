//! Command-line interface for parquad
//!
//! A single command: read a config file, pick a built-in integrand, run the
//! engine with the requested thread count and evaluation budget, then print
//! the result.

use crate::config::{ConfigError, IntegrationConfig};
use crate::functions::TestFunction;
use crate::integrate;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use thiserror::Error;

pub mod output;

pub use output::{Output, Report};

/// Exit status for invalid THREADS/POINTS
pub const EXIT_BAD_COUNTS: u8 = 4;
/// Exit status when the config file cannot be opened
pub const EXIT_CONFIG_UNREADABLE: u8 = 3;
/// Exit status for config contents that fail to parse or validate
pub const EXIT_CONFIG_INVALID: u8 = 5;

#[derive(Parser, Debug)]
#[command(
    name = crate::PKG_NAME,
    version = crate::VERSION,
    about = crate::PKG_DESCRIPTION,
    long_about = "Integrates one of the built-in test functions over the rectangle given in \
                  CONFIG, refining regions until the error tolerance is met or the \
                  evaluation budget runs out.\n\n\
                  CONFIG is a TOML file of `key = value` lines: numbers need a leading \
                  digit (`0.5`, not `.5`) and each key may appear only once.",
    allow_negative_numbers = true
)]
pub struct Cli {
    /// TOML config file with `key = value` lines
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Test function: 1 de Jong 5, 2 Ackley, 3 Langermann, 4 Shubert
    #[arg(value_name = "FUNCTION", value_parser = clap::value_parser!(u8).range(1..=4))]
    pub function: u8,

    /// Number of worker threads
    #[arg(value_name = "THREADS")]
    pub threads: i64,

    /// Soft budget of integrand evaluations
    #[arg(value_name = "POINTS")]
    pub points: i64,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long)]
    pub quiet: bool,

    /// Result format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// THREADS/POINTS combinations the engine cannot run with
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CountError {
    #[error("THREADS must be at least 1")]
    NoThreads,

    #[error("POINTS ({points}) must not be less than THREADS ({threads})")]
    TooFewPoints { threads: i64, points: i64 },

    #[error("THREADS ({0}) is too large for this platform")]
    TooManyThreads(i64),
}

impl Cli {
    pub fn run(self) -> ExitCode {
        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.format);
        match self.execute(&output) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                output.error(&format!("{err:#}"));
                ExitCode::from(exit_code(&err))
            }
        }
    }

    fn execute(&self, output: &Output) -> Result<()> {
        let config = IntegrationConfig::load(&self.config)?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!("effective configuration:\n{}", config.to_toml()?);
        }

        let (threads, points) = check_counts(self.threads, self.points)?;

        // value_parser restricts the range, so this only guards library callers
        let function = TestFunction::from_number(self.function)
            .with_context(|| format!("unknown function number {}", self.function))?;
        let request = config.to_request(threads, points);

        tracing::info!(%function, threads, points, "starting integration");
        let started = Instant::now();
        let integration = integrate::integrate(&request, &function)
            .with_context(|| format!("integration of {function} failed"))?;
        let elapsed = started.elapsed();

        output.report(&Report::new(function, threads, &integration, elapsed))
    }
}

/// Validate THREADS/POINTS as given on the command line and convert them to
/// engine counts.
pub fn check_counts(threads: i64, points: i64) -> Result<(usize, u64), CountError> {
    if threads < 1 {
        return Err(CountError::NoThreads);
    }
    if points < threads {
        return Err(CountError::TooFewPoints { threads, points });
    }
    let thread_count = usize::try_from(threads).map_err(|_| CountError::TooManyThreads(threads))?;
    // points >= threads >= 1
    Ok((thread_count, points.unsigned_abs()))
}

/// Process exit status for a failed run.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
            return match config_err {
                ConfigError::Unreadable { .. } => EXIT_CONFIG_UNREADABLE,
                ConfigError::Invalid(_) => EXIT_CONFIG_INVALID,
            };
        }
        if cause.downcast_ref::<CountError>().is_some() {
            return EXIT_BAD_COUNTS;
        }
    }
    1
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // stdout carries the result
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
