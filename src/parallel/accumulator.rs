use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Shared coordination state for one integration run.
///
/// Every field is its own atomic, and no decision depends on the order in
/// which two different fields change. Final totals are not kept here: each
/// worker folds its own and hands them back when it exits.
#[derive(Debug, Default)]
pub struct Accumulator {
    /// Regions created but not yet accepted or replaced by children.
    in_flight: AtomicUsize,
    /// Integrand evaluations published so far (soft budget).
    evaluations_used: AtomicU64,
    /// Running sum of accepted estimates, stored as `f64` bits.
    accepted_estimate: AtomicU64,
    finished: AtomicBool,
}

/// What a publish did to the in-flight count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// Other regions are still unresolved.
    Pending,
    /// This publish resolved the last region; the caller owns completion.
    Completed,
}

impl Accumulator {
    pub fn new(seeds: usize) -> Self {
        Self {
            in_flight: AtomicUsize::new(seeds),
            ..Self::default()
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn evaluations_used(&self) -> u64 {
        self.evaluations_used.load(Ordering::Relaxed)
    }

    /// Live sum of accepted estimates, used by the relative tolerance.
    pub fn current_estimate(&self) -> f64 {
        f64::from_bits(self.accepted_estimate.load(Ordering::Relaxed))
    }

    /// Best-effort check: other workers may be about to publish.
    pub fn budget_exhausted(&self, points_count: u64) -> bool {
        self.evaluations_used() >= points_count
    }

    /// Record an accepted region: one region resolved.
    pub fn publish_accepted(&self, estimate: f64, evaluations: u64) -> Publish {
        self.evaluations_used
            .fetch_add(evaluations, Ordering::Relaxed);
        // fetch_update only fails when the closure returns None
        let _ = self
            .accepted_estimate
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + estimate).to_bits())
            });
        self.resolve(1, 0)
    }

    /// Record a subdivided region: the parent resolved, `children` created.
    ///
    /// Children must be counted before they become visible to other workers,
    /// otherwise a fast consumer could drive the count to zero early.
    pub fn publish_subdivided(&self, children: usize, evaluations: u64) -> Publish {
        self.evaluations_used
            .fetch_add(evaluations, Ordering::Relaxed);
        self.resolve(1, children)
    }

    fn resolve(&self, resolved: usize, created: usize) -> Publish {
        if created >= resolved {
            self.in_flight
                .fetch_add(created - resolved, Ordering::AcqRel);
            return Publish::Pending;
        }

        let before = self
            .in_flight
            .fetch_sub(resolved - created, Ordering::AcqRel);
        debug_assert!(before >= resolved - created, "in-flight count underflow");

        if before == resolved - created && !self.finished.swap(true, Ordering::AcqRel) {
            Publish::Completed
        } else {
            Publish::Pending
        }
    }
}
