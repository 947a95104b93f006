use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use mocorr_core::deform::{Axis, DeformationModel};
use mocorr_core::frame::{Frame, LocalObservation, ShiftEstimate};
use mocorr_core::movie::Movie;

/// `size x size` square of ones with its top-left corner at `(top, left)`.
pub fn square(shape: (usize, usize), top: usize, left: usize, size: usize) -> Array2<f32> {
    let mut data = Array2::<f32>::zeros(shape);
    for r in top..(top + size).min(shape.0) {
        for c in left..(left + size).min(shape.1) {
            data[[r, c]] = 1.0;
        }
    }
    data
}

/// Isotropic Gaussian centered at `(cy, cx)`.
pub fn gaussian(shape: (usize, usize), cy: f64, cx: f64, sigma: f64) -> Array2<f32> {
    let denom = 2.0 * sigma * sigma;
    Array2::from_shape_fn(shape, |(r, c)| {
        let d2 = (r as f64 - cy).powi(2) + (c as f64 - cx).powi(2);
        (-d2 / denom).exp() as f32
    })
}

/// Smooth, asymmetric test scene: a few Gaussians of different widths.
pub fn scene(shape: (usize, usize)) -> Array2<f32> {
    let (h, w) = (shape.0 as f64, shape.1 as f64);
    let mut data = gaussian(shape, 0.3 * h, 0.4 * w, 0.08 * w);
    data += &(gaussian(shape, 0.65 * h, 0.7 * w, 0.05 * w) * 0.7);
    data += &(gaussian(shape, 0.55 * h, 0.2 * w, 0.03 * w) * 0.4);
    data
}

/// One small Gaussian per `cell x cell` block, jittered and with random
/// brightness, so every region of the frame has features to correlate on.
pub fn blob_field(shape: (usize, usize), cell: usize, seed: u64) -> Array2<f32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Array2::<f32>::zeros(shape);
    let jitter = cell as f64 * 0.3;
    for top in (0..shape.0).step_by(cell) {
        for left in (0..shape.1).step_by(cell) {
            let cy = top as f64 + cell as f64 / 2.0 + rng.random_range(-jitter..jitter);
            let cx = left as f64 + cell as f64 / 2.0 + rng.random_range(-jitter..jitter);
            let amplitude = rng.random_range(0.5f32..1.0);
            data += &(gaussian(shape, cy, cx, 2.0) * amplitude);
        }
    }
    data
}

/// The four-squares scene whose relaxation converges onto one 4x4 block.
pub fn four_squares_movie() -> Movie {
    let corners = [(7, 7), (3, 7), (7, 3), (2, 1)];
    Movie::from_frames(
        corners
            .iter()
            .enumerate()
            .map(|(i, &(top, left))| Frame::from_array(square((15, 15), top, left, 4), i as f64)),
    )
    .unwrap()
}

/// Exact observations of `model` on a grid of positions and times, recorded
/// as corrections (the negated deformation).
pub fn observations_of(model: &DeformationModel, positions: &[f64], times: &[f64]) -> Vec<LocalObservation> {
    let mut out = Vec::new();
    for (frame_index, &t) in times.iter().enumerate() {
        let mut patch_index = 0;
        for &row in positions {
            for &col in positions {
                let dy = model.shift(col, row, t, Axis::Y).unwrap();
                let dx = model.shift(col, row, t, Axis::X).unwrap();
                out.push(LocalObservation {
                    row,
                    col,
                    time_stamp: t,
                    frame_index,
                    patch_index,
                    shift: ShiftEstimate::new(-dy, -dx),
                });
                patch_index += 1;
            }
        }
    }
    out
}
