use super::error::{EngineError, EngineResult};
use super::region::{EVALUATIONS_PER_REGION, Region};
use super::{Integrand, IntegrationRequest};
use crate::parallel::{Accumulator, Publish, WorkQueue};
use std::sync::OnceLock;
use tracing::{debug, error, trace};

/// Why a region stopped being refined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acceptance {
    Converged,
    DepthLimit,
    Budget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Accept(Acceptance),
    Subdivide,
}

/// Totals kept privately by one worker and folded after it exits.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct WorkerTotals {
    pub sum: f64,
    pub error_estimate: f64,
    pub evaluations: u64,
    pub regions_accepted: u64,
    pub regions_subdivided: u64,
    pub budget_limited: u64,
    pub max_depth: usize,
}

impl WorkerTotals {
    pub fn merge(&mut self, other: &WorkerTotals) {
        self.sum += other.sum;
        self.error_estimate += other.error_estimate;
        self.evaluations += other.evaluations;
        self.regions_accepted += other.regions_accepted;
        self.regions_subdivided += other.regions_subdivided;
        self.budget_limited += other.budget_limited;
        self.max_depth = self.max_depth.max(other.max_depth);
    }
}

/// Everything a worker borrows from the orchestrator.
pub(crate) struct Worker<'a, F: ?Sized> {
    pub id: usize,
    pub queue: &'a WorkQueue<Region>,
    pub accumulator: &'a Accumulator,
    pub request: &'a IntegrationRequest,
    pub domain_area: f64,
    pub integrand: &'a F,
    pub fault: &'a OnceLock<EngineError>,
}

/// Shuts the queue down if the owning worker unwinds, so its peers are not
/// left waiting for regions that will never be resolved.
struct PanicGuard<'a> {
    queue: &'a WorkQueue<Region>,
    fault: &'a OnceLock<EngineError>,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let _ = self.fault.set(EngineError::WorkerPanicked);
            self.queue.shutdown();
        }
    }
}

impl<F: Integrand + ?Sized> Worker<'_, F> {
    /// fetch → evaluate → decide → publish, until the queue runs dry.
    pub fn run(self) -> WorkerTotals {
        let _guard = PanicGuard {
            queue: self.queue,
            fault: self.fault,
        };
        let mut totals = WorkerTotals::default();
        debug!(worker = self.id, "worker started");

        while let Some(region) = self.queue.pop() {
            if self.fault.get().is_some() {
                break;
            }
            if let Err(err) = self.process(region, &mut totals) {
                error!(worker = self.id, %err, "aborting integration");
                let _ = self.fault.set(err);
                self.queue.shutdown();
                break;
            }
        }

        debug!(
            worker = self.id,
            accepted = totals.regions_accepted,
            subdivided = totals.regions_subdivided,
            "worker finished"
        );
        totals
    }

    fn process(&self, region: Region, totals: &mut WorkerTotals) -> EngineResult<()> {
        let estimate = region.evaluate(self.integrand)?;
        let error = estimate.error();
        totals.evaluations += EVALUATIONS_PER_REGION;
        totals.max_depth = totals.max_depth.max(region.depth);

        let decision = self.decide(&region, error);
        trace!(worker = self.id, ?region, fine = estimate.fine, error, ?decision);

        match decision {
            Decision::Accept(reason) => {
                totals.sum += estimate.fine;
                totals.error_estimate += error;
                totals.regions_accepted += 1;
                if reason == Acceptance::Budget {
                    totals.budget_limited += 1;
                }

                let publish = self
                    .accumulator
                    .publish_accepted(estimate.fine, EVALUATIONS_PER_REGION);
                if publish == Publish::Completed {
                    debug!(worker = self.id, "last region resolved, shutting down queue");
                    self.queue.shutdown();
                }
            }
            Decision::Subdivide => {
                let children = region.subdivide()?;
                totals.regions_subdivided += 1;
                self.accumulator
                    .publish_subdivided(children.len(), EVALUATIONS_PER_REGION);
                self.queue.push_all(children);
            }
        }
        Ok(())
    }

    /// Accept when the error proxy is within this region's share of the
    /// tolerance, the depth limit is reached, or the budget is spent.
    pub(crate) fn decide(&self, region: &Region, error: f64) -> Decision {
        let request = self.request;
        let tolerance = request
            .abs_err
            .max(request.rel_err * self.accumulator.current_estimate().abs());
        let share = if self.domain_area > 0.0 {
            region.area() / self.domain_area
        } else {
            1.0
        };

        if error <= tolerance * share {
            Decision::Accept(Acceptance::Converged)
        } else if region.depth >= request.max_iter {
            Decision::Accept(Acceptance::DepthLimit)
        } else if self.accumulator.budget_exhausted(request.points_count) {
            Decision::Accept(Acceptance::Budget)
        } else {
            Decision::Subdivide
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker<'a>(
        queue: &'a WorkQueue<Region>,
        accumulator: &'a Accumulator,
        request: &'a IntegrationRequest,
        fault: &'a OnceLock<EngineError>,
        integrand: &'a fn(f64, f64) -> f64,
    ) -> Worker<'a, fn(f64, f64) -> f64> {
        Worker {
            id: 0,
            queue,
            accumulator,
            request,
            domain_area: 100.0,
            integrand,
            fault,
        }
    }

    fn one(_: f64, _: f64) -> f64 {
        1.0
    }

    #[test]
    fn test_decide_rules() {
        let request = IntegrationRequest {
            abs_err: 1.0,
            rel_err: 0.0,
            max_iter: 3,
            points_count: 100,
            ..IntegrationRequest::default()
        };
        let queue = WorkQueue::new();
        let accumulator = Accumulator::new(1);
        let fault = OnceLock::new();
        let f: fn(f64, f64) -> f64 = one;
        let w = worker(&queue, &accumulator, &request, &fault, &f);

        // quarter of the domain gets a quarter of the tolerance
        let region = Region::new(0.0, 5.0, 0.0, 5.0, 0);
        assert_eq!(w.decide(&region, 0.25), Decision::Accept(Acceptance::Converged));
        assert_eq!(w.decide(&region, 0.3), Decision::Subdivide);

        let deep = Region { depth: 3, ..region };
        assert_eq!(w.decide(&deep, 0.3), Decision::Accept(Acceptance::DepthLimit));

        accumulator.publish_subdivided(4, 100);
        assert_eq!(w.decide(&region, 0.3), Decision::Accept(Acceptance::Budget));
    }

    #[test]
    fn test_relative_tolerance_uses_live_estimate() {
        let request = IntegrationRequest {
            abs_err: 1e-12,
            rel_err: 0.01,
            ..IntegrationRequest::default()
        };
        let queue = WorkQueue::new();
        let accumulator = Accumulator::new(2);
        let fault = OnceLock::new();
        let f: fn(f64, f64) -> f64 = one;
        let w = worker(&queue, &accumulator, &request, &fault, &f);

        let region = Region::new(0.0, 10.0, 0.0, 10.0, 0);
        assert_eq!(w.decide(&region, 0.5), Decision::Subdivide);
        accumulator.publish_accepted(-100.0, 25);
        assert_eq!(w.decide(&region, 0.5), Decision::Accept(Acceptance::Converged));
    }

    #[test]
    fn test_run_resolves_everything() {
        let request = IntegrationRequest::default();
        let seeds = Region::seed_grid(0.0, 10.0, 0.0, 10.0, 2, 2).unwrap();
        let queue = WorkQueue::with_items(seeds);
        let accumulator = Accumulator::new(4);
        let fault = OnceLock::new();
        let f: fn(f64, f64) -> f64 = one;

        let totals = worker(&queue, &accumulator, &request, &fault, &f).run();

        assert_eq!(totals.regions_accepted, 4);
        assert_eq!(totals.regions_subdivided, 0);
        assert_eq!(totals.evaluations, 4 * EVALUATIONS_PER_REGION);
        assert_eq!(totals.sum, 100.0);
        assert_eq!(accumulator.in_flight(), 0);
        assert!(queue.is_shutdown());
        assert!(fault.get().is_none());
    }

    #[test]
    fn test_panic_guard_stops_the_run() {
        let queue = WorkQueue::with_items([Region::new(0.0, 1.0, 0.0, 1.0, 0)]);
        let fault = OnceLock::new();

        let joined = crossbeam::thread::scope(|s| {
            s.spawn(|_| {
                let _guard = PanicGuard {
                    queue: &queue,
                    fault: &fault,
                };
                panic!("worker bug");
            })
            .join()
        })
        .unwrap();

        assert!(joined.is_err());
        assert_eq!(fault.get(), Some(&EngineError::WorkerPanicked));
        assert!(queue.is_shutdown());
        // pending work is still drained, then consumers are released
        assert!(queue.pop().is_some());
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_panic_guard_is_silent_on_normal_exit() {
        let queue = WorkQueue::<Region>::new();
        let fault = OnceLock::new();
        drop(PanicGuard {
            queue: &queue,
            fault: &fault,
        });
        assert!(fault.get().is_none());
        assert!(!queue.is_shutdown());
    }

    #[test]
    fn test_merge() {
        let mut a = WorkerTotals {
            sum: 1.0,
            evaluations: 25,
            regions_accepted: 1,
            max_depth: 2,
            ..WorkerTotals::default()
        };
        let b = WorkerTotals {
            sum: 2.0,
            error_estimate: 0.5,
            evaluations: 50,
            regions_accepted: 1,
            regions_subdivided: 1,
            budget_limited: 1,
            max_depth: 5,
        };
        a.merge(&b);
        assert_eq!(a.sum, 3.0);
        assert_eq!(a.evaluations, 75);
        assert_eq!(a.regions_subdivided, 1);
        assert_eq!(a.max_depth, 5);
    }
}
