//! Parallel adaptive quadrature over a rectangle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ seeds  ┌─────────────┐  pop   ┌──────────────┐
//! │ Orchestrator │───────▶│  WorkQueue  │───────▶│  Worker × N  │
//! └──────────────┘        └─────────────┘        └──────────────┘
//!        ▲                       ▲   children (depth + 1)  │
//!        │                       └─────────────────────────┤
//!        │  fold WorkerTotals after join                   │ accepted
//!        └─────────────────────────────────────────────────┘
//! ```
//!
//! The domain is cut into an `init_steps_x × init_steps_y` grid of seed
//! regions. Workers evaluate a region with a coarse and a fine Simpson rule,
//! then either accept the fine estimate or push the four quadrants back onto
//! the queue. The shared [`Accumulator`] counts unresolved regions; the worker
//! that resolves the last one shuts the queue down, which releases every
//! other worker.
//!
//! # Example
//!
//! ```rust
//! use parquad::integrate::{IntegrationRequest, integrate};
//!
//! let request = IntegrationRequest {
//!     thread_count: 2,
//!     x_start: 0.0,
//!     x_end: 1.0,
//!     y_start: 0.0,
//!     y_end: 1.0,
//!     init_steps_x: 4,
//!     init_steps_y: 4,
//!     ..IntegrationRequest::default()
//! };
//! let result = integrate(&request, &|x: f64, y: f64| x * y).unwrap();
//! assert!((result.value - 0.25).abs() < 1e-12);
//! ```

mod error;
mod partition;
mod region;
mod worker;

pub use error::{EngineError, EngineResult};
pub use partition::partition;
pub use region::{EVALUATIONS_PER_REGION, Estimate, Region};

use crate::parallel::{Accumulator, WorkQueue};
use error::ensure_arg;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use worker::{Worker, WorkerTotals};

/// A two-argument real function that may be called from many threads at once.
pub trait Integrand: Sync {
    fn eval(&self, x: f64, y: f64) -> f64;
}

impl<F> Integrand for F
where
    F: Fn(f64, f64) -> f64 + Sync,
{
    fn eval(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

/// Parameters of one integration run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntegrationRequest {
    /// Number of worker threads
    pub thread_count: usize,
    /// Soft budget of integrand evaluations
    pub points_count: u64,
    pub abs_err: f64,
    pub rel_err: f64,
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
    pub init_steps_x: usize,
    pub init_steps_y: usize,
    /// Deepest refinement level a region may be subdivided to
    pub max_iter: usize,
}

impl Default for IntegrationRequest {
    fn default() -> Self {
        Self {
            thread_count: 1,
            points_count: 10_000_000,
            abs_err: 0.000005,
            rel_err: 0.0002,
            x_start: -50.0,
            x_end: 50.0,
            y_start: -50.0,
            y_end: 50.0,
            init_steps_x: 100,
            init_steps_y: 100,
            max_iter: 20,
        }
    }
}

impl IntegrationRequest {
    /// Check the preconditions the engine relies on.
    pub fn validate(&self) -> EngineResult<()> {
        ensure_arg!(self.thread_count >= 1, "thread_count must be at least 1");
        ensure_arg!(
            self.points_count >= self.thread_count as u64,
            "points_count ({}) must not be less than thread_count ({})",
            self.points_count,
            self.thread_count
        );
        ensure_arg!(self.abs_err > 0.0, "abs_err must be positive, got {}", self.abs_err);
        ensure_arg!(self.rel_err >= 0.0, "rel_err must not be negative, got {}", self.rel_err);
        ensure_arg!(
            [self.x_start, self.x_end, self.y_start, self.y_end]
                .iter()
                .all(|v| v.is_finite()),
            "integration bounds must be finite"
        );
        ensure_arg!(
            self.x_start <= self.x_end,
            "x_start ({}) is greater than x_end ({})",
            self.x_start,
            self.x_end
        );
        ensure_arg!(
            self.y_start <= self.y_end,
            "y_start ({}) is greater than y_end ({})",
            self.y_start,
            self.y_end
        );
        ensure_arg!(
            self.init_steps_x >= 1 && self.init_steps_y >= 1,
            "initial grid must have at least one step per axis"
        );
        Ok(())
    }

    pub fn seed_count(&self) -> usize {
        self.init_steps_x * self.init_steps_y
    }

    fn domain_area(&self) -> f64 {
        (self.x_end - self.x_start) * (self.y_end - self.y_start)
    }
}

/// Region bookkeeping for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntegrationStats {
    pub regions_accepted: u64,
    pub regions_subdivided: u64,
    pub max_depth: usize,
    /// Some region was accepted only because the evaluation budget ran out.
    pub budget_exhausted: bool,
}

/// Outcome of [`integrate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Integration {
    pub value: f64,
    pub error_estimate: f64,
    /// Integrand evaluations performed, including for regions later subdivided.
    pub evaluations: u64,
    pub stats: IntegrationStats,
}

impl Integration {
    /// `(value, error_estimate, evaluations)`
    pub fn into_tuple(self) -> (f64, f64, u64) {
        (self.value, self.error_estimate, self.evaluations)
    }
}

/// Integrate `integrand` over the request's rectangle using `thread_count`
/// worker threads.
///
/// # Errors
/// - [`EngineError::InvalidArgument`] when the request fails [`IntegrationRequest::validate`].
/// - [`EngineError::IntegrandFault`] when the integrand panics or returns a
///   non-finite value. All workers stop and no partial result is returned.
/// - [`EngineError::WorkerPanicked`] if a worker dies for any other reason.
pub fn integrate<F>(request: &IntegrationRequest, integrand: &F) -> EngineResult<Integration>
where
    F: Integrand + ?Sized,
{
    request.validate()?;

    let seeds = Region::seed_grid(
        request.x_start,
        request.x_end,
        request.y_start,
        request.y_end,
        request.init_steps_x,
        request.init_steps_y,
    )?;
    let accumulator = Accumulator::new(seeds.len());
    let queue = WorkQueue::with_items(seeds);
    let fault = OnceLock::new();
    let domain_area = request.domain_area();

    debug!(
        seeds = request.seed_count(),
        threads = request.thread_count,
        "seeded work queue"
    );

    let joined = crossbeam::thread::scope(|s| {
        let handles: Vec<_> = (0..request.thread_count)
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: &queue,
                    accumulator: &accumulator,
                    request,
                    domain_area,
                    integrand,
                    fault: &fault,
                };
                s.spawn(move |_| worker.run())
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    })
    .map_err(|_| EngineError::WorkerPanicked)?;

    if let Some(err) = fault.into_inner() {
        return Err(err);
    }

    let mut totals = WorkerTotals::default();
    for result in joined {
        let worker_totals = result.map_err(|_| EngineError::WorkerPanicked)?;
        totals.merge(&worker_totals);
    }
    debug_assert_eq!(accumulator.in_flight(), 0);
    debug_assert_eq!(accumulator.evaluations_used(), totals.evaluations);

    if totals.budget_limited > 0 {
        warn!(
            regions = totals.budget_limited,
            points_count = request.points_count,
            "evaluation budget exhausted, some regions were accepted unrefined"
        );
    }

    let integration = Integration {
        value: totals.sum,
        error_estimate: totals.error_estimate,
        evaluations: totals.evaluations,
        stats: IntegrationStats {
            regions_accepted: totals.regions_accepted,
            regions_subdivided: totals.regions_subdivided,
            max_depth: totals.max_depth,
            budget_exhausted: totals.budget_limited > 0,
        },
    };
    info!(
        value = integration.value,
        error = integration.error_estimate,
        evaluations = integration.evaluations,
        "integration finished"
    );
    Ok(integration)
}
