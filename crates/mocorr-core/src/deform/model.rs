use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::MODEL_COEFFICIENT_COUNT;
use crate::error::{MocorrError, Result};

/// Displacement axis of the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Y = 0,
    X = 1,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Y, Axis::X];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Y => write!(f, "y"),
            Self::X => write!(f, "x"),
        }
    }
}

/// Coefficients of one axis, `c0..c8`.
pub type AxisCoefficients = [f64; MODEL_COEFFICIENT_COUNT];

/// The 2x9 coefficient matrix: row 0 drives the y shift, row 1 the x shift.
///
/// Serializes as a plain nested array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coefficients(pub [AxisCoefficients; 2]);

impl Coefficients {
    pub fn axis(&self, axis: Axis) -> &AxisCoefficients {
        &self.0[axis.index()]
    }

    pub fn axis_mut(&mut self, axis: Axis) -> &mut AxisCoefficients {
        &mut self.0[axis.index()]
    }
}

/// `S(x, y, t) = (c0 + c1 x + c2 x^2 + c3 y + c4 y^2 + c5 x y) * (c6 t + c7 t^2 + c8 t^3)`
#[inline]
pub fn evaluate_shift(c: &AxisCoefficients, x: f64, y: f64, t: f64) -> f64 {
    spatial_factor(c, x, y) * temporal_factor(c, t)
}

#[inline]
pub(crate) fn spatial_factor(c: &AxisCoefficients, x: f64, y: f64) -> f64 {
    c[0] + c[1] * x + c[2] * x * x + c[3] * y + c[4] * y * y + c[5] * x * y
}

#[inline]
pub(crate) fn temporal_factor(c: &AxisCoefficients, t: f64) -> f64 {
    let t2 = t * t;
    c[6] * t + c[7] * t2 + c[8] * t2 * t
}

/// Smooth doming deformation: a spatially quadratic, temporally cubic shift
/// field per axis.
///
/// A new model has no coefficients; it becomes usable after
/// [`fit`](DeformationModel::fit), [`randomize`](DeformationModel::randomize)
/// or [`from_coefficients`](DeformationModel::from_coefficients).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeformationModel {
    pub(crate) coefficients: Option<Coefficients>,
}

impl DeformationModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_coefficients(coefficients: Coefficients) -> Self {
        Self {
            coefficients: Some(coefficients),
        }
    }

    pub fn coefficients(&self) -> Option<&Coefficients> {
        self.coefficients.as_ref()
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    pub(crate) fn require_coefficients(&self) -> Result<&Coefficients> {
        self.coefficients.as_ref().ok_or(MocorrError::ModelNotFitted)
    }

    /// Shift along `axis` at column `x`, row `y` and time `t`.
    pub fn shift(&self, x: f64, y: f64, t: f64, axis: Axis) -> Result<f64> {
        let c = self.require_coefficients()?;
        Ok(evaluate_shift(c.axis(axis), x, y, t))
    }
}
