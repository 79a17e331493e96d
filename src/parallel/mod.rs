//! Thread-coordination primitives for the integration engine
//!
//! This module holds the shared state that worker threads use to hand work to
//! each other and to agree on when the run is over. It knows nothing about
//! quadrature; the integration module supplies the work items.
//!
//! # Architecture Responsibilities
//!
//! ## What This Module Does:
//! - **Work Distribution**: [`WorkQueue`] is a blocking FIFO shared by all workers
//! - **Termination**: [`Accumulator`] counts unresolved work and reports the
//!   single publish that resolves the last item
//! - **Shutdown**: [`WorkQueue::shutdown`] releases every parked consumer
//!
//! ## What This Module Does NOT Do:
//! - **Numerics**: evaluation and accept/subdivide decisions live in `integrate`
//! - **Thread Spawning**: the orchestrator owns the `crossbeam::thread::scope`
//!
//! # Termination Protocol
//! ```text
//! seed N items          in_flight = N
//! accept one item       in_flight -= 1   (0 → Completed → queue.shutdown())
//! replace by k children in_flight += k-1 (before the children are pushed)
//! ```
//! Queue emptiness is never used as the completion signal: a worker can be
//! holding a popped item whose children are not pushed yet.
//!
//! # Example Usage
//!
//! ```rust
//! use parquad::parallel::{Accumulator, Publish, WorkQueue};
//!
//! let queue = WorkQueue::with_items([1, 2]);
//! let accumulator = Accumulator::new(2);
//!
//! while let Some(_item) = queue.pop() {
//!     if accumulator.publish_accepted(0.0, 1) == Publish::Completed {
//!         queue.shutdown();
//!     }
//! }
//! assert_eq!(accumulator.in_flight(), 0);
//! ```

pub mod accumulator;
pub mod queue;

// Re-export main types for easier access
pub use accumulator::{Accumulator, Publish};
pub use queue::WorkQueue;
