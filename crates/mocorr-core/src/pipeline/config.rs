use serde::{Deserialize, Serialize};

use crate::error::{MocorrError, Result};

pub use crate::align::{RelaxationConfig, RelaxationMode};
pub use crate::deform::FitConfig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub relaxation: RelaxationConfig,
    /// Estimate local motion and fit the deformation model after global
    /// alignment.
    pub local: bool,
    pub fit: FitConfig,
    pub warp: WarpConfig,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            relaxation: RelaxationConfig::default(),
            local: true,
            fit: FitConfig::default(),
            warp: WarpConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpConfig {
    /// Resampling factor used while warping.
    pub supersample: usize,
    /// Time every frame is rendered at. Defaults to the first frame's time stamp.
    pub reference_time: Option<f64>,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self {
            supersample: 1,
            reference_time: None,
        }
    }
}

impl CorrectionConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(MocorrError::InvalidParameter(msg));

        let threshold = self.relaxation.convergence_threshold;
        if !(threshold >= 0.0 && threshold.is_finite()) {
            return invalid(format!("convergence_threshold must be a finite non-negative number, got {threshold}"));
        }
        if self.warp.supersample == 0 {
            return invalid("supersample must be at least 1".into());
        }
        if let Some(t) = self.warp.reference_time {
            if !t.is_finite() {
                return invalid(format!("reference_time must be finite, got {t}"));
            }
        }
        let fit = &self.fit;
        if !(fit.initial_lambda > 0.0) || !(fit.lambda_up > 1.0) || !(fit.lambda_down > 0.0 && fit.lambda_down < 1.0) {
            return invalid("fit damping needs initial_lambda > 0, lambda_up > 1 and 0 < lambda_down < 1".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CorrectionConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.local);
        assert_eq!(config.warp.supersample, 1);
        assert_eq!(config.relaxation.max_iterations, 10);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = CorrectionConfig::default();
        config.warp.supersample = 0;
        assert!(config.validate().is_err());

        let mut config = CorrectionConfig::default();
        config.relaxation.convergence_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = CorrectionConfig::default();
        config.fit.lambda_down = 2.0;
        assert!(config.validate().is_err());
    }
}
