use ndarray::Array2;

use crate::raster::Raster;

/// A single time-stamped grayscale frame of a movie.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Pixel content, mutated in place by correction passes.
    pub raster: Raster,
    /// Identity of the frame within its movie.
    pub time_stamp: f64,
}

impl Frame {
    pub fn new(raster: Raster, time_stamp: f64) -> Self {
        Self { raster, time_stamp }
    }

    pub fn from_array(data: Array2<f32>, time_stamp: f64) -> Self {
        Self::new(Raster::from_array(data), time_stamp)
    }

    /// `(height, width)`
    pub fn shape(&self) -> (usize, usize) {
        self.raster.shape()
    }

    pub fn width(&self) -> usize {
        self.raster.width()
    }

    pub fn height(&self) -> usize {
        self.raster.height()
    }
}

/// Displacement of one grid relative to the consensus of its group.
///
/// This is the correction that was applied: translating the grid by
/// `(-dy, -dx)` brings it onto the consensus.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShiftEstimate {
    pub dy: f64,
    pub dx: f64,
}

impl ShiftEstimate {
    pub fn new(dy: f64, dx: f64) -> Self {
        Self { dy, dx }
    }

    /// Largest absolute component.
    pub fn magnitude(&self) -> f64 {
        self.dy.abs().max(self.dx.abs())
    }
}

/// A local shift measured at the center of one patch of one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalObservation {
    /// Patch center row.
    pub row: f64,
    /// Patch center column.
    pub col: f64,
    pub time_stamp: f64,
    /// Index of the source frame within the movie.
    pub frame_index: usize,
    /// Row-major index into the patch grid.
    pub patch_index: usize,
    pub shift: ShiftEstimate,
}
