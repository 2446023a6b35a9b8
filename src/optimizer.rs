//! Derivative-based maximum search over a scalar function of one parameter.
//!
//! The search runs in two phases: a coarse grid scan that brackets the best sampled
//! point, then a bisection on the sign of a central-difference slope. The refinement
//! never fails; when it runs out of iterations it reports the midpoint of the last
//! bracket with `converged = false`.

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

pub const DEFAULT_TOLERANCE: f64 = 0.001;
pub const DEFAULT_MAX_ITER: usize = 100;

/// Bracket width is divided by this to get the finite-difference step.
const SLOPE_STEP_DIVISOR: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optimizer {
    tolerance: f64,
    max_iter: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Maximum {
    pub argument: f64,
    pub converged: bool,
    pub iterations: usize,
    /// Bracket produced by the coarse scan.
    pub bracket: (f64, f64),
}

impl Maximum {
    /// True when the estimate sits strictly inside `range` and did not drift onto
    /// (or past) a boundary, where a monotone objective would push it.
    pub fn is_interior(&self, range: (f64, f64)) -> bool {
        self.argument > range.0 && self.argument < range.1
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_iter: DEFAULT_MAX_ITER,
        }
    }
}

impl Optimizer {
    pub fn new(tolerance: f64, max_iter: usize) -> Result<Self> {
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(PipelineError::InvalidOptimizer(format!(
                "tolerance must be positive, got {tolerance}"
            )));
        }
        if max_iter == 0 {
            return Err(PipelineError::InvalidOptimizer(
                "max_iter must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            tolerance,
            max_iter,
        })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Finds the argument maximising `f` inside `search_range`.
    ///
    /// Extra arguments are captured by the closure. The objective is assumed unimodal over
    /// the range; on a multi-modal objective the result brackets the best sampled mode only.
    /// The tolerance is compared to the raw slope, so objectives far from unit scale should
    /// be rescaled by the caller.
    pub fn find_maximum<F>(&self, f: F, search_range: (f64, f64), step: f64) -> Result<Maximum>
    where
        F: Fn(f64) -> f64,
    {
        let (low, high) = search_range;
        validate_range(low, high, step)?;
        let bracket = coarse_scan(&f, low, high, step);
        Ok(self.refine_bracket(&f, bracket))
    }

    /// Same as [`Optimizer::find_maximum`], with the coarse grid evaluated on the rayon pool.
    pub fn par_find_maximum<F>(
        &self,
        f: F,
        search_range: (f64, f64),
        step: f64,
    ) -> Result<Maximum>
    where
        F: Fn(f64) -> f64 + Sync,
    {
        let (low, high) = search_range;
        validate_range(low, high, step)?;
        let bracket = par_coarse_scan(&f, low, high, step);
        Ok(self.refine_bracket(&f, bracket))
    }

    fn refine_bracket<F>(&self, f: &F, bracket: (f64, f64)) -> Maximum
    where
        F: Fn(f64) -> f64,
    {
        let (argument, converged, iterations) = self.refine(f, bracket.0, bracket.1);
        if converged {
            debug!(argument, iterations, "maximum converged");
        } else {
            warn!(
                argument,
                max_iter = self.max_iter,
                "maximum search hit max iterations without converging"
            );
        }
        Maximum {
            argument,
            converged,
            iterations,
            bracket,
        }
    }

    /// Bisects `[a, b]` on the sign of the slope at the midpoint.
    ///
    /// Returns `(midpoint, converged, iterations_used)`.
    pub fn refine<F>(&self, f: &F, mut a: f64, mut b: f64) -> (f64, bool, usize)
    where
        F: Fn(f64) -> f64,
    {
        for iteration in 0..self.max_iter {
            let dx = (b - a) / SLOPE_STEP_DIVISOR;
            let slope_a = slope(f, a, dx);
            let slope_b = slope(f, b, dx);
            if slope_a.abs() < self.tolerance && slope_b.abs() < self.tolerance {
                return ((a + b) / 2.0, true, iteration);
            }

            let c = (a + b) / 2.0;
            if slope(f, c, dx) < 0.0 {
                b = c;
            } else {
                a = c;
            }
        }
        ((a + b) / 2.0, false, self.max_iter)
    }
}

/// Central-difference estimate of `f'(x)`.
pub fn slope<F>(f: &F, x: f64, dx: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    (f(x + dx) - f(x - dx)) / (2.0 * dx)
}

/// Samples `low, low+step, ...` strictly below `high` and returns
/// `[best - step, best + step]` around the first point attaining the maximum.
pub fn coarse_scan<F>(f: &F, low: f64, high: f64, step: f64) -> (f64, f64)
where
    F: Fn(f64) -> f64,
{
    let best = (0..grid_len(low, high, step))
        .filter_map(|i| sample(f, low, high, step, i))
        .reduce(better_sample);
    bracket_around(best, low, step)
}

/// Parallel [`coarse_scan`]; ties still go to the smallest grid index.
pub fn par_coarse_scan<F>(f: &F, low: f64, high: f64, step: f64) -> (f64, f64)
where
    F: Fn(f64) -> f64 + Sync,
{
    let best = (0..grid_len(low, high, step))
        .into_par_iter()
        .filter_map(|i| sample(f, low, high, step, i))
        .reduce_with(better_sample);
    bracket_around(best, low, step)
}

/// Grid index, argument and value of one coarse sample.
type Sample = (usize, f64, f64);

fn grid_len(low: f64, high: f64, step: f64) -> usize {
    ((high - low) / step).ceil() as usize
}

// Grid points are generated by index to avoid accumulating step error.
fn sample<F>(f: &F, low: f64, high: f64, step: f64, index: usize) -> Option<Sample>
where
    F: Fn(f64) -> f64,
{
    let x = low + index as f64 * step;
    (x < high).then(|| (index, x, f(x)))
}

/// Higher value wins, NaN loses to anything, and equal values go to the lower index.
fn better_sample(a: Sample, b: Sample) -> Sample {
    let (first, second) = if a.0 <= b.0 { (a, b) } else { (b, a) };
    if second.2 > first.2 || (first.2.is_nan() && !second.2.is_nan()) {
        second
    } else {
        first
    }
}

fn bracket_around(best: Option<Sample>, low: f64, step: f64) -> (f64, f64) {
    let x = best.map_or(low, |(_, x, _)| x);
    (x - step, x + step)
}

fn validate_range(low: f64, high: f64, step: f64) -> Result<()> {
    if !low.is_finite() || !high.is_finite() || low >= high {
        return Err(PipelineError::InvalidSearchRange { low, high });
    }
    let width = high - low;
    if !step.is_finite() || step <= 0.0 || step >= width {
        return Err(PipelineError::InvalidStep { step, width });
    }
    Ok(())
}
