use ndarray::{s, Array2};

use crate::consts::PATCH_GRID_SIZE;

/// Split `extent` into `count` bands of `extent / count`, enlarging the first
/// `extent % count` bands by one so the bands cover the extent exactly.
pub fn band_sizes(extent: usize, count: usize) -> Vec<usize> {
    if count == 0 {
        return Vec::new();
    }
    let regular = extent / count;
    let remainder = extent % count;
    (0..count)
        .map(|i| if i < remainder { regular + 1 } else { regular })
        .collect()
}

/// Start offset of every band.
fn band_offsets(sizes: &[usize]) -> Vec<usize> {
    sizes
        .iter()
        .scan(0, |acc, &size| {
            let start = *acc;
            *acc += size;
            Some(start)
        })
        .collect()
}

/// Rectangular region of one patch, half-open on both axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchBounds {
    pub row_band: usize,
    pub col_band: usize,
    pub row_start: usize,
    pub col_start: usize,
    pub height: usize,
    pub width: usize,
}

impl PatchBounds {
    /// Band offset plus half the patch extent (truncated) on each axis.
    pub fn center(&self) -> (usize, usize) {
        (
            self.row_start + self.height / 2,
            self.col_start + self.width / 2,
        )
    }
}

/// Fixed `n x n` partition of a grid shape into near-equal patches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchGrid {
    row_sizes: Vec<usize>,
    col_sizes: Vec<usize>,
    row_offsets: Vec<usize>,
    col_offsets: Vec<usize>,
}

impl PatchGrid {
    /// The standard 5x5 partition.
    pub fn new(shape: (usize, usize)) -> Self {
        Self::with_bands(shape, PATCH_GRID_SIZE)
    }

    pub fn with_bands(shape: (usize, usize), bands: usize) -> Self {
        let row_sizes = band_sizes(shape.0, bands);
        let col_sizes = band_sizes(shape.1, bands);
        Self {
            row_offsets: band_offsets(&row_sizes),
            col_offsets: band_offsets(&col_sizes),
            row_sizes,
            col_sizes,
        }
    }

    pub fn row_sizes(&self) -> &[usize] {
        &self.row_sizes
    }

    pub fn col_sizes(&self) -> &[usize] {
        &self.col_sizes
    }

    pub fn patch_count(&self) -> usize {
        self.row_sizes.len() * self.col_sizes.len()
    }

    /// Bounds of the patch at row-major `index`.
    pub fn bounds(&self, index: usize) -> PatchBounds {
        let cols = self.col_sizes.len();
        let row_band = index / cols;
        let col_band = index % cols;
        PatchBounds {
            row_band,
            col_band,
            row_start: self.row_offsets[row_band],
            col_start: self.col_offsets[col_band],
            height: self.row_sizes[row_band],
            width: self.col_sizes[col_band],
        }
    }

    /// All patch bounds in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = PatchBounds> + '_ {
        (0..self.patch_count()).map(move |i| self.bounds(i))
    }

    /// Copy every patch out of `data`, in row-major order.
    pub fn partition(&self, data: &Array2<f32>) -> Vec<Array2<f32>> {
        self.iter().map(|b| extract_patch(data, &b)).collect()
    }
}

pub fn extract_patch(data: &Array2<f32>, bounds: &PatchBounds) -> Array2<f32> {
    data.slice(s![
        bounds.row_start..bounds.row_start + bounds.height,
        bounds.col_start..bounds.col_start + bounds.width
    ])
    .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_sizes_cover_extent_and_differ_by_at_most_one() {
        for extent in 0..64 {
            let sizes = band_sizes(extent, 5);
            assert_eq!(sizes.len(), 5);
            assert_eq!(sizes.iter().sum::<usize>(), extent);
            let max = *sizes.iter().max().unwrap();
            let min = *sizes.iter().min().unwrap();
            assert!(max - min <= 1, "extent {extent}: {sizes:?}");
            if extent % 5 == 0 {
                assert_eq!(max, min);
            }
        }
    }

    #[test]
    fn leading_bands_absorb_remainder() {
        assert_eq!(band_sizes(13, 5), vec![3, 3, 3, 2, 2]);
        assert_eq!(band_sizes(4, 5), vec![1, 1, 1, 1, 0]);
    }

    #[test]
    fn centers_follow_band_layout() {
        let grid = PatchGrid::new((13, 10));
        assert_eq!(grid.patch_count(), 25);

        // row bands [3,3,3,2,2], col bands [2,2,2,2,2]
        assert_eq!(grid.bounds(0).center(), (1, 1));
        assert_eq!(grid.bounds(1).center(), (1, 3));
        assert_eq!(grid.bounds(5).center(), (4, 1));
        assert_eq!(grid.bounds(24).center(), (12, 9));
    }

    #[test]
    fn partition_covers_every_pixel_once() {
        let data = Array2::from_shape_fn((17, 12), |(r, c)| (r * 12 + c) as f32);
        let grid = PatchGrid::new(data.dim());
        let patches = grid.partition(&data);
        assert_eq!(patches.len(), 25);

        let total: f32 = patches.iter().map(|p| p.sum()).sum();
        assert_eq!(total, data.sum());

        let b = grid.bounds(7);
        assert_eq!(patches[7][[0, 0]], data[[b.row_start, b.col_start]]);
        assert_eq!(patches[7].dim(), (b.height, b.width));
    }
}
