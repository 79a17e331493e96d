//! # parquad - Parallel Adaptive Quadrature
//!
//! Estimates the integral of a function of two variables over a rectangle.
//! The domain starts as a uniform grid of regions; a fixed pool of worker
//! threads pulls regions from a shared queue and either accepts each one or
//! splits it into four, until every region meets the error tolerance, hits
//! the depth limit, or the evaluation budget runs out.
//!
//! ## Features
//!
//! - **Library first**: [`integrate::integrate`] takes any `Fn(f64, f64) -> f64 + Sync`
//! - **Deterministic totals**: per-worker sums folded after join, no shared float lock
//! - **Fault aware**: a panicking or non-finite integrand stops every worker
//! - **Layered config**: embedded defaults, config file, `PARQUAD_*` env overrides
//!
//! ## Quick Start
//!
//! ```bash
//! # Integrate the Ackley function with 8 threads and a 10M evaluation budget
//! parquad run.cfg 2 8 10000000
//! ```

pub mod cli;
pub mod config;
pub mod functions;
pub mod integrate;
pub mod parallel;

pub use cli::Cli;
pub use config::IntegrationConfig;
pub use integrate::{Integration, IntegrationRequest, integrate};

/// Result type alias for parquad operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
