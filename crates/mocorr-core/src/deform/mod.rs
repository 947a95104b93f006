pub mod fit;
pub mod model;
pub mod solver;
pub mod synth;
pub mod warp;

pub use fit::{AxisFit, FitConfig, FitReport};
pub use model::{evaluate_shift, Axis, AxisCoefficients, Coefficients, DeformationModel};
pub use synth::random_coefficients;
pub use warp::{bilinear_interpolate, downsample_mean};
