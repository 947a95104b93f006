use std::fmt;

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{DEFAULT_CONVERGENCE_THRESHOLD, DEFAULT_RELAXATION_ITERATIONS};
use crate::error::{MocorrError, Result};
use crate::frame::ShiftEstimate;

use super::cross_correlation::compute_shift;
use super::translate::translate;

/// How a relaxation pass visits the grids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelaxationMode {
    /// Grids are visited in index order; each update is visible to the
    /// grids after it in the same pass.
    #[default]
    Sequential,
    /// Every grid is aligned in parallel against the consensus at the start
    /// of the pass and then steps `(n - 1) / n` of the measured shift toward
    /// it. Steps may be fractional, so content is resampled bilinearly.
    /// Faster on many grids, but only approximate.
    ParallelRelaxed,
}

impl fmt::Display for RelaxationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "Sequential"),
            Self::ParallelRelaxed => write!(f, "Parallel (relaxed)"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaxationConfig {
    /// Upper bound on passes over the grids.
    pub max_iterations: usize,
    /// Stop once the largest per-pass correction falls below this (pixels).
    pub convergence_threshold: f64,
    pub mode: RelaxationMode,
}

impl Default for RelaxationConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_RELAXATION_ITERATIONS,
            convergence_threshold: DEFAULT_CONVERGENCE_THRESHOLD,
            mode: RelaxationMode::Sequential,
        }
    }
}

/// Accumulated shifts of a relaxation run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelaxationResult {
    /// One entry per input grid, in input order.
    pub shifts: Vec<ShiftEstimate>,
    /// Passes actually performed.
    pub iterations: usize,
    /// `false` when the iteration cap was hit first; shifts may then be
    /// under-corrected.
    pub converged: bool,
}

/// Estimate the displacement of every grid relative to the sum of all the
/// others by iterative relaxation.
///
/// `raw` is left holding the aligned grids.
pub fn relative_shifts(raw: &mut [Array2<f32>], config: &RelaxationConfig) -> Result<RelaxationResult> {
    let Some(first) = raw.first() else {
        return Ok(RelaxationResult {
            converged: true,
            ..Default::default()
        });
    };
    let shape = first.dim();
    if let Some(bad) = raw.iter().find(|g| g.dim() != shape) {
        return Err(MocorrError::ShapeMismatch {
            expected: shape,
            actual: bad.dim(),
        });
    }

    match config.mode {
        RelaxationMode::Sequential => relax_sequential(raw, config),
        RelaxationMode::ParallelRelaxed => relax_parallel(raw, config),
    }
}

fn grid_sum(raw: &[Array2<f32>]) -> Array2<f32> {
    let mut total = Array2::<f32>::zeros(raw[0].dim());
    for grid in raw {
        total += grid;
    }
    total
}

fn relax_sequential(raw: &mut [Array2<f32>], config: &RelaxationConfig) -> Result<RelaxationResult> {
    let mut total = grid_sum(raw);
    let mut shifts = vec![ShiftEstimate::default(); raw.len()];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let mut max_change = 0.0f64;

        for (grid, accumulated) in raw.iter_mut().zip(shifts.iter_mut()) {
            let residual = &total - &*grid;
            let step = compute_shift(&residual, grid)?;

            accumulated.dy += step.dy;
            accumulated.dx += step.dx;
            *grid = translate(grid, -step.dy, -step.dx);
            total = residual + &*grid;
            max_change = max_change.max(step.magnitude());
        }

        debug!(iteration = iterations, max_change, "relaxation pass");
        if max_change < config.convergence_threshold {
            converged = true;
            break;
        }
    }

    Ok(RelaxationResult {
        shifts,
        iterations,
        converged,
    })
}

fn relax_parallel(raw: &mut [Array2<f32>], config: &RelaxationConfig) -> Result<RelaxationResult> {
    let n = raw.len();
    let damping = if n > 1 { (n - 1) as f64 / n as f64 } else { 1.0 };
    let mut shifts = vec![ShiftEstimate::default(); n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let total = grid_sum(raw);

        let steps: Vec<Result<ShiftEstimate>> = raw
            .par_iter()
            .map(|grid| {
                let residual = &total - grid;
                compute_shift(&residual, grid).map(|s| ShiftEstimate {
                    dy: s.dy * damping,
                    dx: s.dx * damping,
                })
            })
            .collect();
        let steps = steps.into_iter().collect::<Result<Vec<_>>>()?;

        raw.par_iter_mut().zip(steps.par_iter()).for_each(|(grid, step)| {
            *grid = translate(grid, -step.dy, -step.dx);
        });

        let mut max_change = 0.0f64;
        for (accumulated, step) in shifts.iter_mut().zip(&steps) {
            accumulated.dy += step.dy;
            accumulated.dx += step.dx;
            max_change = max_change.max(step.magnitude());
        }

        debug!(iteration = iterations, max_change, "relaxed parallel pass");
        if max_change < config.convergence_threshold {
            converged = true;
            break;
        }
    }

    Ok(RelaxationResult {
        shifts,
        iterations,
        converged,
    })
}
