use tracing::debug;

use crate::align::motion::{calculate_local_shifts, correct_global_shift};
use crate::align::relaxation::RelaxationConfig;
use crate::error::{MocorrError, Result};
use crate::frame::{Frame, LocalObservation, ShiftEstimate};
use crate::raster::Raster;

/// Ordered collection of frames sharing one shape, keyed by time stamp.
#[derive(Clone, Debug, Default)]
pub struct Movie {
    frames: Vec<Frame>,
}

impl Movie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a movie from frames, checking every insertion.
    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Result<Self> {
        let mut movie = Self::new();
        for frame in frames {
            movie.add(frame)?;
        }
        Ok(movie)
    }

    /// Append a frame. Fails without modifying the movie when the time stamp
    /// is already present or the shape differs from the existing frames.
    pub fn add(&mut self, frame: Frame) -> Result<()> {
        if self.frames.iter().any(|f| f.time_stamp == frame.time_stamp) {
            return Err(MocorrError::DuplicateTimeStamp {
                time_stamp: frame.time_stamp,
            });
        }
        if let Some(expected) = self.shape() {
            if frame.shape() != expected {
                return Err(MocorrError::ShapeMismatch {
                    expected,
                    actual: frame.shape(),
                });
            }
        }
        self.add_unchecked(frame);
        Ok(())
    }

    /// Append a frame without any invariant checks.
    pub fn add_unchecked(&mut self, frame: Frame) {
        debug!(time_stamp = frame.time_stamp, "adding frame");
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Shape shared by all frames, `None` for an empty movie.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.frames.first().map(Frame::shape)
    }

    pub fn time_stamps(&self) -> Vec<f64> {
        self.frames.iter().map(|f| f.time_stamp).collect()
    }

    /// Elementwise sum of all frames.
    pub fn sum_frames(&self) -> Result<Raster> {
        Raster::sum(self.frames.iter().map(|f| &f.raster)).ok_or(MocorrError::EmptySequence)
    }

    /// Align whole frames against each other and rewrite their pixels in place.
    pub fn correct_global_shift(&mut self, config: &RelaxationConfig) -> Result<Vec<ShiftEstimate>> {
        correct_global_shift(self, config)
    }

    /// Estimate per-patch shifts over the (already globally corrected) frames.
    pub fn calculate_local_shifts(&self, config: &RelaxationConfig) -> Result<Vec<LocalObservation>> {
        calculate_local_shifts(self, config)
    }
}
