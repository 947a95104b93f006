use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{MocorrError, Result};
use crate::raster::Raster;

use super::model::{evaluate_shift, Axis, Coefficients, DeformationModel};

impl DeformationModel {
    /// Re-render `source`, captured at time `t1`, as it would appear at `t2`.
    ///
    /// Output pixel `(y, x)` reads the source at `(y, x)` displaced by the
    /// model's shift difference between `t2` and `t1`. With `supersample > 1`
    /// the warp runs on a grid `supersample` times finer (each source pixel
    /// replicated) and the result is block-averaged back to the source shape.
    /// Shifts stay in source pixel units whatever the factor.
    pub fn apply(&self, source: &Raster, t1: f64, t2: f64, supersample: usize) -> Result<Raster> {
        let coefficients = self.require_coefficients()?;
        if supersample == 0 {
            return Err(MocorrError::InvalidParameter(
                "supersample factor must be at least 1".into(),
            ));
        }
        if t1 == t2 {
            return Ok(source.clone());
        }

        let (h, w) = source.shape();
        let (fine_h, fine_w) = (h * supersample, w * supersample);
        let warp_row = |y: usize| -> Vec<f32> {
            (0..fine_w)
                .map(|x| warp_pixel(source, coefficients, y, x, t1, t2, supersample))
                .collect()
        };

        let fine = if fine_h * fine_w >= PARALLEL_PIXEL_THRESHOLD {
            let rows: Vec<Vec<f32>> = (0..fine_h).into_par_iter().map(warp_row).collect();
            let mut out = Array2::<f32>::zeros((fine_h, fine_w));
            for (y, row) in rows.into_iter().enumerate() {
                for (x, val) in row.into_iter().enumerate() {
                    out[[y, x]] = val;
                }
            }
            out
        } else {
            let mut out = Array2::<f32>::zeros((fine_h, fine_w));
            for y in 0..fine_h {
                for (x, val) in warp_row(y).into_iter().enumerate() {
                    out[[y, x]] = val;
                }
            }
            out
        };

        if supersample == 1 {
            Ok(Raster::from_array(fine))
        } else {
            Ok(Raster::from_array(downsample_mean(&fine, supersample)))
        }
    }
}

fn warp_pixel(
    source: &Raster,
    coefficients: &Coefficients,
    y: usize,
    x: usize,
    t1: f64,
    t2: f64,
    scale: usize,
) -> f32 {
    let s = scale as f64;
    let (oy, ox) = (y as f64 / s, x as f64 / s);
    let shift = |axis: Axis| {
        let c = coefficients.axis(axis);
        s * (evaluate_shift(c, ox, oy, t2) - evaluate_shift(c, ox, oy, t1))
    };
    let pos_y = y as f64 + shift(Axis::Y);
    let pos_x = x as f64 + shift(Axis::X);

    let (y0, y1) = (pos_y.floor(), pos_y.ceil());
    let (x0, x1) = (pos_x.floor(), pos_x.ceil());
    let read = |r: f64, c: f64| source.get_scaled(r as i64, c as i64, scale) as f64;

    bilinear_interpolate(
        (y0, x0),
        (y1, x1),
        [read(y0, x0), read(y0, x1), read(y1, x0), read(y1, x1)],
        pos_y,
        pos_x,
    ) as f32
}

/// Interpolate at `(y, x)` inside the cell spanned by `(y0, x0)` and
/// `(y1, x1)`. `values` are at `(y0,x0)`, `(y0,x1)`, `(y1,x0)`, `(y1,x1)`.
///
/// A degenerate axis (`y0 == y1` or `x0 == x1`) is not interpolated along.
pub fn bilinear_interpolate(
    (y0, x0): (f64, f64),
    (y1, x1): (f64, f64),
    values: [f64; 4],
    y: f64,
    x: f64,
) -> f64 {
    let [v00, v01, v10, v11] = values;
    let (top, bottom) = if x0 == x1 {
        (v00, v10)
    } else {
        let fx = (x - x0) / (x1 - x0);
        (v00 * (1.0 - fx) + v01 * fx, v10 * (1.0 - fx) + v11 * fx)
    };
    if y0 == y1 {
        top
    } else {
        let fy = (y - y0) / (y1 - y0);
        top * (1.0 - fy) + bottom * fy
    }
}

/// Mean over non-overlapping `factor x factor` blocks.
pub fn downsample_mean(data: &Array2<f32>, factor: usize) -> Array2<f32> {
    let (h, w) = data.dim();
    let (out_h, out_w) = (h / factor, w / factor);
    let norm = (factor * factor) as f64;
    Array2::from_shape_fn((out_h, out_w), |(r, c)| {
        let block = data.slice(ndarray::s![r * factor..(r + 1) * factor, c * factor..(c + 1) * factor]);
        (block.iter().map(|&v| v as f64).sum::<f64>() / norm) as f32
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spatially constant shift of `speed * t` along y only.
    fn drifting_model(speed: f64) -> DeformationModel {
        let mut c = Coefficients::default();
        c.axis_mut(Axis::Y)[0] = 1.0;
        c.axis_mut(Axis::Y)[6] = speed;
        DeformationModel::from_coefficients(c)
    }

    fn ramp(h: usize, w: usize) -> Raster {
        Raster::from_array(Array2::from_shape_fn((h, w), |(r, c)| (r * w + c) as f32))
    }

    #[test]
    fn equal_times_give_an_exact_copy() {
        let mut model = DeformationModel::new();
        model.randomize_seeded((12, 9), 5.0, Some(3)).unwrap();
        let source = ramp(12, 9);
        assert_eq!(model.apply(&source, 2.0, 2.0, 1).unwrap(), source);
    }

    #[test]
    fn zero_displacement_is_an_exact_copy() {
        let source = ramp(10, 10);
        let model = DeformationModel::from_coefficients(Coefficients::default());
        assert_eq!(model.apply(&source, 0.0, 4.0, 1).unwrap(), source);
    }

    #[test]
    fn constant_drift_moves_content() {
        let source = ramp(10, 6);
        let out = drifting_model(1.0).apply(&source, 0.0, 2.0, 1).unwrap();
        for r in 0..10 {
            for c in 0..6 {
                let expected = if r + 2 < 10 { source.data[[r + 2, c]] } else { 0.0 };
                assert_eq!(out.data[[r, c]], expected);
            }
        }
    }

    #[test]
    fn supersampling_keeps_the_displacement() {
        let source = ramp(8, 8);
        let model = drifting_model(0.5);
        let plain = model.apply(&source, 0.0, 2.0, 1).unwrap();
        let fine = model.apply(&source, 0.0, 2.0, 2).unwrap();
        assert_eq!(fine.shape(), (8, 8));
        for (a, b) in plain.data.iter().zip(fine.data.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn unfitted_model_cannot_warp() {
        let err = DeformationModel::new().apply(&ramp(4, 4), 0.0, 1.0, 1).unwrap_err();
        assert!(matches!(err, MocorrError::ModelNotFitted));
    }

    #[test]
    fn zero_supersample_is_rejected() {
        let model = drifting_model(1.0);
        assert!(model.apply(&ramp(4, 4), 0.0, 1.0, 0).is_err());
    }

    #[test]
    fn bilinear_corners_and_center() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let cell = ((0.0, 0.0), (1.0, 1.0));
        assert_eq!(bilinear_interpolate(cell.0, cell.1, values, 0.0, 0.0), 1.0);
        assert_eq!(bilinear_interpolate(cell.0, cell.1, values, 0.0, 1.0), 2.0);
        assert_eq!(bilinear_interpolate(cell.0, cell.1, values, 1.0, 0.0), 3.0);
        assert_eq!(bilinear_interpolate(cell.0, cell.1, values, 1.0, 1.0), 4.0);
        assert_eq!(bilinear_interpolate(cell.0, cell.1, values, 0.5, 0.5), 2.5);
    }

    #[test]
    fn bilinear_degenerate_axes() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(bilinear_interpolate((2.0, 0.0), (2.0, 1.0), values, 2.0, 0.25), 1.25);
        assert_eq!(bilinear_interpolate((0.0, 5.0), (1.0, 5.0), values, 0.5, 5.0), 2.0);
        assert_eq!(bilinear_interpolate((3.0, 3.0), (3.0, 3.0), values, 3.0, 3.0), 1.0);
    }

    #[test]
    fn block_mean() {
        let data = Array2::from_shape_vec((2, 4), vec![1.0, 3.0, 0.0, 0.0, 5.0, 7.0, 4.0, 8.0]).unwrap();
        let out = downsample_mean(&data, 2);
        assert_eq!(out, Array2::from_shape_vec((1, 2), vec![4.0, 3.0]).unwrap());
    }
}
