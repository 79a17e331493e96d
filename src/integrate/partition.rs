//! Even subdivision of one axis into breakpoints.

use super::error::{EngineResult, ensure_arg};

/// Split `[start, end]` into `n` equal cells and return the `n + 1` breakpoints.
///
/// The first and last breakpoints are exactly `start` and `end`; interior
/// points are computed directly from their index so rounding never
/// accumulates along the axis.
///
/// # Errors
/// Returns [`EngineError::InvalidArgument`](super::EngineError::InvalidArgument)
/// when `n == 0`.
pub fn partition(n: usize, start: f64, end: f64) -> EngineResult<Vec<f64>> {
    ensure_arg!(n >= 1, "cannot partition [{start}, {end}] into zero cells");

    let step = (end - start) / n as f64;
    let mut breakpoints = Vec::with_capacity(n + 1);
    breakpoints.push(start);
    breakpoints.extend((1..n).map(|i| start + i as f64 * step));
    breakpoints.push(end);

    Ok(breakpoints)
}
