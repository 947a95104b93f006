use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::consts::{
    RANDOM_CURVATURE_RATIO, RANDOM_MAX_CURVATURE_EFFECT, RANDOM_MAX_CURVATURE_FRACTION, RANDOM_MIN_CURVATURE,
    RANDOM_ORIGIN_MARGIN, RANDOM_PEAK_SCALE_MAX, RANDOM_PEAK_SCALE_MIN,
};
use crate::error::{MocorrError, Result};

use super::model::{Axis, AxisCoefficients, Coefficients, DeformationModel};

impl DeformationModel {
    /// Replace the coefficients with a random, physically plausible doming
    /// for frames of `shape` spanning times `0..=t_max`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, shape: (usize, usize), t_max: f64, rng: &mut R) -> Result<()> {
        self.coefficients = Some(random_coefficients(shape, t_max, rng)?);
        Ok(())
    }

    /// [`randomize`](Self::randomize) with a ChaCha generator, seeded when
    /// `seed` is given and from the OS otherwise.
    pub fn randomize_seeded(&mut self, shape: (usize, usize), t_max: f64, seed: Option<u64>) -> Result<()> {
        let mut rng: ChaCha8Rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_os_rng(),
        };
        self.randomize(shape, t_max, &mut rng)
    }
}

pub fn random_coefficients<R: Rng + ?Sized>(shape: (usize, usize), t_max: f64, rng: &mut R) -> Result<Coefficients> {
    let (height, width) = shape;
    if height == 0 || width == 0 {
        return Err(MocorrError::InvalidDimensions { width, height });
    }
    if !(t_max > 0.0 && t_max.is_finite()) {
        return Err(MocorrError::InvalidParameter(format!(
            "t_max must be positive and finite, got {t_max}"
        )));
    }

    let mut coefficients = Coefficients::default();
    for axis in Axis::ALL {
        *coefficients.axis_mut(axis) = random_axis(height as f64, width as f64, t_max, rng);
        debug!(%axis, coefficients = ?coefficients.axis(axis), "random doming drawn");
    }
    Ok(coefficients)
}

/// Elliptic paraboloid with its minimum (zero) at a random origin, rotated by
/// a random angle, scaled by a cubic in time that starts at zero and ends at
/// a random peak value.
fn random_axis<R: Rng + ?Sized>(h: f64, w: f64, t_max: f64, rng: &mut R) -> AxisCoefficients {
    let mut c = [0.0; 9];

    let hi = RANDOM_MAX_CURVATURE_FRACTION / w;
    let lo = RANDOM_MIN_CURVATURE.min(hi * 0.5);
    let cx = rng.random_range(lo..=hi);

    let longer = w.max(h);
    let budget = (RANDOM_MAX_CURVATURE_EFFECT * longer - cx * w * w) / (h * h);
    let upper = (RANDOM_CURVATURE_RATIO * cx).min(budget);
    let lower = (cx / RANDOM_CURVATURE_RATIO).min(upper);
    let cy = rng.random_range(lower..=upper);

    let theta = rng.random_range(-PI..PI);
    let (sin, cos) = theta.sin_cos();
    let a = cx * cos * cos + cy * sin * sin;
    let b = cx * sin * sin + cy * cos * cos;
    let cross = 2.0 * (cy - cx) * sin * cos;

    let px = rng.random_range(-RANDOM_ORIGIN_MARGIN * w..(1.0 + RANDOM_ORIGIN_MARGIN) * w);
    let py = rng.random_range(-RANDOM_ORIGIN_MARGIN * h..(1.0 + RANDOM_ORIGIN_MARGIN) * h);

    c[0] = a * px * px + b * py * py + cross * px * py;
    c[1] = -2.0 * a * px - cross * py;
    c[2] = a;
    c[3] = -2.0 * b * py - cross * px;
    c[4] = b;
    c[5] = cross;

    let peak = rng.random_range(RANDOM_PEAK_SCALE_MIN..RANDOM_PEAK_SCALE_MAX);
    c[6] = 3.0 * peak / t_max;
    c[7] = -6.0 * peak / (t_max * t_max);
    c[8] = 4.0 * peak / (t_max * t_max * t_max);

    c
}
