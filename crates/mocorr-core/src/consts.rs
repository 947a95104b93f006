/// Number of patch bands along each axis for local motion estimation.
pub const PATCH_GRID_SIZE: usize = 5;

/// Default cap on relaxation passes.
pub const DEFAULT_RELAXATION_ITERATIONS: usize = 10;

/// Relaxation stops once no grid moved by this many pixels (or more) in a pass.
pub const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 0.2;

/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Relative tolerance under which two correlation values count as a tie.
/// FFT round-off must not reorder exact ties of the spatial correlation.
pub const CORRELATION_TIE_TOLERANCE: f64 = 1e-9;

/// Number of coefficients per axis in the doming model.
pub const MODEL_COEFFICIENT_COUNT: usize = 9;

/// Minimum number of observations needed for a determined fit.
pub const MIN_FIT_OBSERVATIONS: usize = MODEL_COEFFICIENT_COUNT;

/// Default Levenberg-Marquardt iteration cap for model fitting.
pub const DEFAULT_FIT_ITERATIONS: usize = 200;

/// Lower bound of the random quadratic curvature (clamped below the upper bound).
pub const RANDOM_MIN_CURVATURE: f64 = 1e-4;

/// Upper bound of the x curvature, as a fraction of the image width per pixel.
pub const RANDOM_MAX_CURVATURE_FRACTION: f64 = 0.05;

/// Combined curvature effect must stay below this fraction of the longer side.
pub const RANDOM_MAX_CURVATURE_EFFECT: f64 = 0.1;

/// Maximum ratio between the x and y curvatures (and its inverse).
pub const RANDOM_CURVATURE_RATIO: f64 = 3.0;

/// The doming origin may lie this fraction of each dimension outside the image.
pub const RANDOM_ORIGIN_MARGIN: f64 = 0.1;

/// Range of the peak temporal scale.
pub const RANDOM_PEAK_SCALE_MIN: f64 = 0.001;
pub const RANDOM_PEAK_SCALE_MAX: f64 = 2.0;

/// MRC header size in bytes (excluding any extended header).
pub const MRC_HEADER_SIZE: usize = 1024;
