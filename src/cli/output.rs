//! Result rendering for the command line
//!
//! The result goes to stdout; diagnostics go to stderr with `console` styling.

use super::Format;
use crate::functions::TestFunction;
use crate::integrate::{Integration, IntegrationStats};
use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

/// Everything printed for a finished run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub function: TestFunction,
    pub threads: usize,
    pub value: f64,
    pub error_estimate: f64,
    pub evaluations: u64,
    pub elapsed_ms: u64,
    pub stats: IntegrationStats,
}

impl Report {
    pub fn new(
        function: TestFunction,
        threads: usize,
        integration: &Integration,
        elapsed: Duration,
    ) -> Self {
        Self {
            function,
            threads,
            value: integration.value,
            error_estimate: integration.error_estimate,
            evaluations: integration.evaluations,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            stats: integration.stats.clone(),
        }
    }

    /// Four lines: value, error estimate, evaluations, elapsed milliseconds
    pub fn to_text(&self) -> String {
        format!(
            "{:.17}\n{:.17}\n{}\n{}\n",
            self.value, self.error_estimate, self.evaluations, self.elapsed_ms
        )
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }
}

/// Output handler for consistent CLI formatting
pub struct Output {
    format: Format,
}

impl Output {
    pub fn new(format: Format) -> Self {
        Self { format }
    }

    pub fn report(&self, report: &Report) -> Result<()> {
        let rendered = match self.format {
            Format::Text => report.to_text(),
            Format::Json => report.to_json()? + "\n",
        };
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(rendered.as_bytes())
            .and_then(|()| stdout.flush())
            .context("Failed to write result")
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        // Errors are always shown, even in quiet mode
        eprintln!("{} {}", style("✖").red(), message);
    }
}
