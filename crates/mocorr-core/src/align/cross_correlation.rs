use ndarray::{s, Array2, ArrayViewMut2, Axis};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::consts::CORRELATION_TIE_TOLERANCE;
use crate::error::{MocorrError, Result};
use crate::frame::ShiftEstimate;

/// Integer displacement of `moving` relative to `reference`.
///
/// The full linear cross-correlation surface has shape `(2h - 1, 2w - 1)`
/// and its center tap `(h - 1, w - 1)` is zero displacement. The result is
/// `center - peak`: translating `moving` by the negated result lines it up
/// with `reference`. Ties go to the first maximum in row-major order. A
/// featureless surface (e.g. an all-zero input) yields zero displacement.
pub fn compute_shift(reference: &Array2<f32>, moving: &Array2<f32>) -> Result<ShiftEstimate> {
    let (h, w) = reference.dim();
    if moving.dim() != (h, w) {
        return Err(MocorrError::ShapeMismatch {
            expected: (h, w),
            actual: moving.dim(),
        });
    }
    if h == 0 || w == 0 {
        return Ok(ShiftEstimate::default());
    }

    let surface = correlation_surface(reference, moving);
    let Some((peak_row, peak_col)) = find_peak(&surface) else {
        return Ok(ShiftEstimate::default());
    };

    Ok(ShiftEstimate {
        dy: (h - 1) as f64 - peak_row as f64,
        dx: (w - 1) as f64 - peak_col as f64,
    })
}

/// Full linear cross-correlation of `reference` with `moving`, equivalent to
/// convolving `reference` with `moving` rotated by 180 degrees.
///
/// `surface[[n, m]] = sum reference[[i, j]] * moving[[i - n + h - 1, j - m + w - 1]]`
pub fn correlation_surface(reference: &Array2<f32>, moving: &Array2<f32>) -> Array2<f64> {
    let (h, w) = reference.dim();
    let padded = (2 * h - 1, 2 * w - 1);

    let ref_fft = fft2d_padded(reference, padded);
    let mov_fft = fft2d_padded(moving, padded);

    let cross = ndarray::Zip::from(&ref_fft)
        .and(&mov_fft)
        .map_collect(|r, m| r * m.conj());

    // Circular lag k lands at k mod P; the surface wants lag k at k + (h - 1).
    let circular = ifft2d(cross);
    let (ph, pw) = padded;
    Array2::from_shape_fn(padded, |(row, col)| {
        circular[[(row + h) % ph, (col + w) % pw]]
    })
}

/// Row-major position of the first maximum, treating values within a small
/// relative tolerance of the maximum as tied. `None` for a flat surface.
fn find_peak(surface: &Array2<f64>) -> Option<(usize, usize)> {
    let (max, min) = surface
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), &v| (hi.max(v), lo.min(v)));
    let tolerance = CORRELATION_TIE_TOLERANCE * max.abs().max(min.abs());
    if max.is_nan() || max - min <= tolerance {
        return None;
    }

    surface
        .indexed_iter()
        .find(|(_, v)| **v >= max - tolerance)
        .map(|(pos, _)| pos)
}

/// 2D FFT of `data` zero-padded to `padded`.
fn fft2d_padded(data: &Array2<f32>, padded: (usize, usize)) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();

    let mut spectrum = Array2::<Complex<f64>>::zeros(padded);
    spectrum
        .slice_mut(s![..h, ..w])
        .zip_mut_with(data, |out, &v| *out = Complex::new(v as f64, 0.0));

    // Padding rows are zero and transform to zero, so only the data rows need a pass.
    transform_lanes(
        spectrum.slice_mut(s![..h, ..]),
        Axis(1),
        &*planner.plan_fft_forward(padded.1),
    );
    transform_lanes(spectrum.view_mut(), Axis(0), &*planner.plan_fft_forward(padded.0));
    spectrum
}

/// Inverse of [`fft2d_padded`] without the crop: real part, scaled by `1 / (h * w)`.
fn ifft2d(mut spectrum: Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = spectrum.dim();
    let mut planner = FftPlanner::new();
    transform_lanes(spectrum.view_mut(), Axis(0), &*planner.plan_fft_inverse(h));
    transform_lanes(spectrum.view_mut(), Axis(1), &*planner.plan_fft_inverse(w));

    let scale = 1.0 / (h * w) as f64;
    spectrum.mapv(|v| v.re * scale)
}

/// Run `fft` over every lane of `data` along `axis`.
fn transform_lanes(mut data: ArrayViewMut2<Complex<f64>>, axis: Axis, fft: &dyn Fft<f64>) {
    let mut buffer = vec![Complex::default(); data.len_of(axis)];
    for mut lane in data.lanes_mut(axis) {
        buffer.iter_mut().zip(lane.iter()).for_each(|(b, &v)| *b = v);
        fft.process(&mut buffer);
        lane.iter_mut().zip(&buffer).for_each(|(v, &b)| *v = b);
    }
}
