use ndarray::{s, Array2};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::raster::sample_bilinear;

/// Move `data` by `(dy, dx)`: `out[[r, c]] = data[[r - dy, c - dx]]`.
///
/// Integer offsets are an exact copy; fractional offsets are resampled
/// bilinearly. Pixels uncovered by the move are zero.
pub fn translate(data: &Array2<f32>, dy: f64, dx: f64) -> Array2<f32> {
    if dy == 0.0 && dx == 0.0 {
        return data.clone();
    }
    if dy.fract() == 0.0 && dx.fract() == 0.0 {
        return translate_integer(data, dy as i64, dx as i64);
    }

    let (h, w) = data.dim();
    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| {
                (0..w)
                    .map(|col| sample_bilinear(data, row as f64 - dy, col as f64 - dx))
                    .collect()
            })
            .collect();

        let mut result = Array2::<f32>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        result
    } else {
        Array2::from_shape_fn((h, w), |(row, col)| {
            sample_bilinear(data, row as f64 - dy, col as f64 - dx)
        })
    }
}

fn translate_integer(data: &Array2<f32>, dy: i64, dx: i64) -> Array2<f32> {
    let (h, w) = data.dim();
    let mut result = Array2::<f32>::zeros((h, w));
    let (h, w) = (h as i64, w as i64);
    if dy.abs() >= h || dx.abs() >= w {
        return result;
    }

    let (dst_r0, src_r0) = if dy >= 0 { (dy as usize, 0) } else { (0, (-dy) as usize) };
    let (dst_c0, src_c0) = if dx >= 0 { (dx as usize, 0) } else { (0, (-dx) as usize) };
    let rows = (h - dy.abs()) as usize;
    let cols = (w - dx.abs()) as usize;

    result
        .slice_mut(s![dst_r0..dst_r0 + rows, dst_c0..dst_c0 + cols])
        .assign(&data.slice(s![src_r0..src_r0 + rows, src_c0..src_c0 + cols]));
    result
}
