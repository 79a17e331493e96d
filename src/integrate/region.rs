//! Rectangular work items and the per-region quadrature rules.
//!
//! Each region is evaluated with two tensor-product Simpson rules:
//!
//! ```text
//! coarse: 3x3 grid, weights (1,4,1) ⊗ (1,4,1) · (Δx/6)(Δy/6)
//! fine:   5x5 grid, weights (1,4,2,4,1) ⊗ (1,4,2,4,1) · (Δx/12)(Δy/12)
//! ```
//!
//! The coarse points are the even-indexed points of the fine grid, so a
//! region costs [`EVALUATIONS_PER_REGION`] integrand calls. The difference of
//! the two estimates is the error proxy.

use super::Integrand;
use super::error::{EngineError, EngineResult};
use super::partition::partition;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Points per axis of the fine grid.
const GRID: usize = 5;

/// Integrand evaluations spent on every processed region.
pub const EVALUATIONS_PER_REGION: u64 = (GRID * GRID) as u64;

const FINE_WEIGHTS: [f64; GRID] = [1.0, 4.0, 2.0, 4.0, 1.0];
const COARSE_WEIGHTS: [f64; GRID] = [1.0, 0.0, 4.0, 0.0, 1.0];

/// One rectangle of the domain plus its refinement depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub depth: usize,
}

/// Both estimates for one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub coarse: f64,
    pub fine: f64,
}

impl Estimate {
    /// Local error proxy: disagreement between the two rules.
    pub fn error(&self) -> f64 {
        (self.fine - self.coarse).abs()
    }
}

impl Region {
    pub fn new(x0: f64, x1: f64, y0: f64, y1: f64, depth: usize) -> Self {
        Self {
            x0,
            x1,
            y0,
            y1,
            depth,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Build the initial grid of depth-0 regions, row by row along `y`.
    pub fn seed_grid(
        x_start: f64,
        x_end: f64,
        y_start: f64,
        y_end: f64,
        steps_x: usize,
        steps_y: usize,
    ) -> EngineResult<Vec<Region>> {
        let xs = partition(steps_x, x_start, x_end)?;
        let ys = partition(steps_y, y_start, y_end)?;

        let mut seeds = Vec::with_capacity(steps_x * steps_y);
        for y in ys.windows(2) {
            for x in xs.windows(2) {
                seeds.push(Region::new(x[0], x[1], y[0], y[1], 0));
            }
        }
        Ok(seeds)
    }

    /// Evaluate both quadrature rules over this region.
    ///
    /// A panic inside the integrand, or a NaN/infinite sample, is reported as
    /// [`EngineError::IntegrandFault`] at the offending point.
    pub fn evaluate<F: Integrand + ?Sized>(&self, f: &F) -> EngineResult<Estimate> {
        let hx = self.width() / (GRID - 1) as f64;
        let hy = self.height() / (GRID - 1) as f64;

        let mut fine = 0.0;
        let mut coarse = 0.0;

        for (i, (&wfx, &wcx)) in FINE_WEIGHTS.iter().zip(&COARSE_WEIGHTS).enumerate() {
            let x = if i == GRID - 1 { self.x1 } else { self.x0 + i as f64 * hx };
            for (j, (&wfy, &wcy)) in FINE_WEIGHTS.iter().zip(&COARSE_WEIGHTS).enumerate() {
                let y = if j == GRID - 1 { self.y1 } else { self.y0 + j as f64 * hy };
                let value = sample(f, x, y)?;
                fine += wfx * wfy * value;
                coarse += wcx * wcy * value;
            }
        }

        let area = self.area();
        Ok(Estimate {
            coarse: coarse / 36.0 * area,
            fine: fine / 144.0 * area,
        })
    }

    /// Split both axes in two and return the four children one level deeper.
    pub fn subdivide(&self) -> EngineResult<[Region; 4]> {
        let xs = partition(2, self.x0, self.x1)?;
        let ys = partition(2, self.y0, self.y1)?;
        let depth = self.depth + 1;

        Ok([
            Region::new(xs[0], xs[1], ys[0], ys[1], depth),
            Region::new(xs[1], xs[2], ys[0], ys[1], depth),
            Region::new(xs[0], xs[1], ys[1], ys[2], depth),
            Region::new(xs[1], xs[2], ys[1], ys[2], depth),
        ])
    }
}

fn sample<F: Integrand + ?Sized>(f: &F, x: f64, y: f64) -> EngineResult<f64> {
    let value = catch_unwind(AssertUnwindSafe(|| f.eval(x, y))).map_err(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "integrand panicked".to_string());
        EngineError::IntegrandFault { x, y, reason }
    })?;

    if !value.is_finite() {
        return Err(EngineError::IntegrandFault {
            x,
            y,
            reason: format!("non-finite value {value}"),
        });
    }
    Ok(value)
}
