use ndarray::Array2;
use tracing::trace;

/// A bounds-checked grayscale grid, indexed `(row, col)`.
///
/// Reads outside the grid yield `0.0`; writes outside the grid are dropped.
/// Pixel data is row-major with shape `(height, width)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    pub data: Array2<f32>,
}

impl Raster {
    pub fn zeros(shape: (usize, usize)) -> Self {
        Self {
            data: Array2::zeros(shape),
        }
    }

    pub fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }

    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    fn contains(&self, row: i64, col: i64) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height() && (col as usize) < self.width()
    }

    /// Value at `(row, col)`, or `0.0` outside the grid.
    pub fn get(&self, row: i64, col: i64) -> f32 {
        if self.contains(row, col) {
            self.data[[row as usize, col as usize]]
        } else {
            0.0
        }
    }

    /// Value at `(row / scale, col / scale)` using floor division, so a grid
    /// addressed at `scale`-times resolution reads each source pixel as a
    /// `scale x scale` block.
    pub fn get_scaled(&self, row: i64, col: i64, scale: usize) -> f32 {
        let scale = scale.max(1) as i64;
        self.get(row.div_euclid(scale), col.div_euclid(scale))
    }

    /// Write `value` at `(row, col)`. Returns `false` (and leaves the grid
    /// untouched) when the position is outside the grid.
    pub fn set(&mut self, row: i64, col: i64, value: f32) -> bool {
        if !self.contains(row, col) {
            trace!(row, col, "dropping write outside raster bounds");
            return false;
        }
        self.data[[row as usize, col as usize]] = value;
        true
    }

    /// Resample to `shape` with bilinear interpolation.
    ///
    /// Output pixel centers are mapped onto the source pixel centers; sample
    /// positions past the last row/column are clamped to the border.
    pub fn resize(&self, shape: (usize, usize)) -> Raster {
        let (src_h, src_w) = self.shape();
        let (dst_h, dst_w) = shape;
        if shape == (src_h, src_w) {
            return self.clone();
        }
        if src_h == 0 || src_w == 0 {
            return Raster::zeros(shape);
        }

        let scale_y = src_h as f64 / dst_h.max(1) as f64;
        let scale_x = src_w as f64 / dst_w.max(1) as f64;
        let max_y = (src_h - 1) as f64;
        let max_x = (src_w - 1) as f64;

        let data = Array2::from_shape_fn(shape, |(row, col)| {
            let y = ((row as f64 + 0.5) * scale_y - 0.5).clamp(0.0, max_y);
            let x = ((col as f64 + 0.5) * scale_x - 0.5).clamp(0.0, max_x);
            sample_bilinear(&self.data, y, x)
        });

        Raster { data }
    }

    /// Zero out a regular grid of lines, `line_width` pixels thick and
    /// `spacing` pixels apart. Makes non-rigid warps easy to see.
    pub fn add_grid(&mut self, line_width: usize, spacing: usize) {
        let period = line_width + spacing;
        if period == 0 {
            return;
        }
        for ((row, col), value) in self.data.indexed_iter_mut() {
            if (col + spacing) % period < line_width || (row + spacing) % period < line_width {
                *value = 0.0;
            }
        }
    }

    /// Elementwise sum of equally shaped rasters.
    pub fn sum<'a, I>(rasters: I) -> Option<Raster>
    where
        I: IntoIterator<Item = &'a Raster>,
    {
        let mut iter = rasters.into_iter();
        let first = iter.next()?;
        let mut total = first.data.clone();
        for raster in iter {
            total += &raster.data;
        }
        Some(Raster { data: total })
    }
}

impl From<Array2<f32>> for Raster {
    fn from(data: Array2<f32>) -> Self {
        Self { data }
    }
}

/// Bilinear read of `data` at fractional `(y, x)`. Taps outside the grid
/// read as zero, so integer positions return the pixel itself.
pub fn sample_bilinear(data: &Array2<f32>, y: f64, x: f64) -> f32 {
    let (y0, x0) = (y.floor(), x.floor());
    let (fy, fx) = ((y - y0) as f32, (x - x0) as f32);
    let (row, col) = (y0 as i64, x0 as i64);
    let tap = |r: i64, c: i64| -> f32 {
        if r < 0 || c < 0 {
            return 0.0;
        }
        data.get((r as usize, c as usize)).copied().unwrap_or(0.0)
    };

    let top = lerp(tap(row, col), tap(row, col + 1), fx);
    let bottom = lerp(tap(row + 1, col), tap(row + 1, col + 1), fx);
    lerp(top, bottom, fy)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_outside_bounds_are_zero() {
        let raster = Raster::from_array(Array2::from_elem((3, 4), 2.0));
        assert_eq!(raster.get(0, 0), 2.0);
        assert_eq!(raster.get(2, 3), 2.0);
        assert_eq!(raster.get(-1, 0), 0.0);
        assert_eq!(raster.get(0, 4), 0.0);
        assert_eq!(raster.get(3, 0), 0.0);
    }

    #[test]
    fn writes_outside_bounds_are_dropped() {
        let mut raster = Raster::zeros((2, 2));
        assert!(!raster.set(5, 5, 1.0));
        assert!(!raster.set(-1, 0, 1.0));
        assert!(raster.set(1, 1, 3.0));
        assert_eq!(raster.data.sum(), 3.0);
    }

    #[test]
    fn scaled_access_replicates_pixels() {
        let mut raster = Raster::zeros((2, 2));
        raster.set(0, 1, 7.0);
        assert_eq!(raster.get_scaled(0, 2, 2), 7.0);
        assert_eq!(raster.get_scaled(1, 3, 2), 7.0);
        assert_eq!(raster.get_scaled(0, 1, 2), 0.0);
        assert_eq!(raster.get_scaled(-1, 2, 2), 0.0);
    }

    #[test]
    fn resize_preserves_constant_image() {
        let raster = Raster::from_array(Array2::from_elem((8, 6), 0.5));
        let resized = raster.resize((4, 9));
        assert_eq!(resized.shape(), (4, 9));
        assert!(resized.data.iter().all(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn bilinear_reads_blend_neighbors() {
        let data = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(sample_bilinear(&data, 0.0, 0.0), 1.0);
        assert_eq!(sample_bilinear(&data, 1.0, 1.0), 4.0);
        assert!((sample_bilinear(&data, 0.5, 0.5) - 2.5).abs() < 1e-6);
        // The missing right-hand taps read as zero.
        assert!((sample_bilinear(&data, 0.0, 1.5) - 1.0).abs() < 1e-6);
        assert_eq!(sample_bilinear(&data, -3.0, 0.0), 0.0);
    }

    #[test]
    fn grid_zeroes_lines() {
        let mut raster = Raster::from_array(Array2::from_elem((10, 10), 1.0));
        raster.add_grid(1, 4);
        // spacing 4, width 1 => lines at rows/cols 1, 6
        assert_eq!(raster.get(1, 3), 0.0);
        assert_eq!(raster.get(3, 6), 0.0);
        assert_eq!(raster.get(3, 3), 1.0);
    }

    #[test]
    fn sum_adds_elementwise() {
        let a = Raster::from_array(Array2::from_elem((2, 2), 1.0));
        let b = Raster::from_array(Array2::from_elem((2, 2), 2.0));
        let total = Raster::sum([&a, &b]).unwrap();
        assert!(total.data.iter().all(|&v| v == 3.0));
        assert!(Raster::sum(std::iter::empty::<&Raster>()).is_none());
    }
}
