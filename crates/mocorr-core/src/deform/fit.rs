use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::{DEFAULT_FIT_ITERATIONS, MODEL_COEFFICIENT_COUNT};
use crate::error::{MocorrError, Result};
use crate::frame::LocalObservation;

use super::model::{spatial_factor, temporal_factor, Axis, AxisCoefficients, Coefficients, DeformationModel};
use super::solver::{optimize, LmModel, LmSettings};

const N: usize = MODEL_COEFFICIENT_COUNT;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub max_iterations: usize,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    /// Relative step size below which the fit counts as converged.
    pub tolerance: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_FIT_ITERATIONS,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            tolerance: 1e-12,
        }
    }
}

impl From<&FitConfig> for LmSettings {
    fn from(config: &FitConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            initial_lambda: config.initial_lambda,
            lambda_up: config.lambda_up,
            lambda_down: config.lambda_down,
            tolerance: config.tolerance,
        }
    }
}

/// Per-axis outcome of a fit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisFit {
    pub axis: Axis,
    /// Residual sum of squares in pixels^2.
    pub residual: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitReport {
    pub y: AxisFit,
    pub x: AxisFit,
}

#[derive(Clone, Copy, Debug)]
struct Sample {
    x: f64,
    y: f64,
    t: f64,
    value: f64,
}

/// Coordinates are divided by their largest magnitude so all nine basis
/// terms are of order one.
#[derive(Clone, Copy, Debug)]
struct Normalization {
    x: f64,
    y: f64,
    t: f64,
}

impl Normalization {
    fn from_observations(observations: &[LocalObservation]) -> Self {
        let extent = |f: fn(&LocalObservation) -> f64| {
            let m = observations.iter().fold(0.0f64, |a, o| a.max(f(o).abs()));
            if m > 0.0 && m.is_finite() { m } else { 1.0 }
        };
        Self {
            x: extent(|o| o.col),
            y: extent(|o| o.row),
            t: extent(|o| o.time_stamp),
        }
    }

    /// Factor turning an original coefficient into its normalized counterpart.
    fn scales(&self) -> AxisCoefficients {
        let (sx, sy, st) = (self.x, self.y, self.t);
        [1.0, sx, sx * sx, sy, sy * sy, sx * sy, st, st * st, st * st * st]
    }
}

struct DomingFunction;

impl LmModel<N> for DomingFunction {
    type Sample = Sample;

    fn residual(&self, s: &Sample, p: &[f64; N]) -> f64 {
        s.value - spatial_factor(p, s.x, s.y) * temporal_factor(p, s.t)
    }

    fn jacobian_row(&self, s: &Sample, p: &[f64; N]) -> [f64; N] {
        let spatial = spatial_factor(p, s.x, s.y);
        let temporal = temporal_factor(p, s.t);
        let (x, y, t) = (s.x, s.y, s.t);
        [
            temporal,
            x * temporal,
            x * x * temporal,
            y * temporal,
            y * y * temporal,
            x * y * temporal,
            t * spatial,
            t * t * spatial,
            t * t * t * spatial,
        ]
    }
}

impl DeformationModel {
    /// Fit both axes to local shift observations, replacing any previous
    /// coefficients.
    ///
    /// Observed shifts are corrections, so the model is fitted to their
    /// negation: the deformation is the displacement the correction undoes.
    /// The observation row feeds `y` and the column feeds `x`. Each axis is
    /// solved independently from an all-ones starting point.
    pub fn fit(&mut self, observations: &[LocalObservation], config: &FitConfig) -> Result<FitReport> {
        if observations.is_empty() {
            return Err(MocorrError::EmptySequence);
        }

        let norm = Normalization::from_observations(observations);
        let scales = norm.scales();
        let settings = LmSettings::from(config);

        let mut coefficients = Coefficients::default();
        let mut fits = Vec::with_capacity(2);

        for axis in Axis::ALL {
            let samples: Vec<Sample> = observations
                .iter()
                .map(|o| Sample {
                    x: o.col / norm.x,
                    y: o.row / norm.y,
                    t: o.time_stamp / norm.t,
                    value: match axis {
                        Axis::Y => -o.shift.dy,
                        Axis::X => -o.shift.dx,
                    },
                })
                .collect();

            let result = optimize(&DomingFunction, &samples, scales, &settings);

            let target = coefficients.axis_mut(axis);
            for ((c, p), scale) in target.iter_mut().zip(result.params).zip(scales) {
                *c = p / scale;
            }

            if result.converged {
                debug!(%axis, iterations = result.iterations, residual = result.chi2, "axis fit converged");
            } else {
                warn!(%axis, iterations = result.iterations, residual = result.chi2, "axis fit hit the iteration cap");
            }

            fits.push(AxisFit {
                axis,
                residual: result.chi2,
                iterations: result.iterations,
                converged: result.converged,
            });
        }

        self.coefficients = Some(coefficients);
        info!(observations = observations.len(), "deformation model fitted");

        Ok(FitReport { y: fits[0], x: fits[1] })
    }
}
