use rayon::prelude::*;
use tracing::info;

use crate::deform::DeformationModel;
use crate::error::{MocorrError, Result};
use crate::frame::Frame;
use crate::movie::Movie;
use crate::raster::Raster;

/// Render `reference` (taken to be the scene at `t = 0`) at every time in
/// `time_stamps`, in order.
pub fn synthesize_movie(
    reference: &Raster,
    model: &DeformationModel,
    time_stamps: &[f64],
    supersample: usize,
) -> Result<Movie> {
    let frames: Vec<Frame> = time_stamps
        .par_iter()
        .map(|&t| model.apply(reference, 0.0, t, supersample).map(|r| Frame::new(r, t)))
        .collect::<Result<_>>()?;
    let movie = Movie::from_frames(frames)?;
    info!(frames = movie.len(), supersample, "synthesized movie");
    Ok(movie)
}

/// Draw a random doming for `reference` and render `frame_count` frames at
/// times `0, 1, .., frame_count - 1`.
///
/// The same `seed` always yields the same model and movie.
pub fn synthesize_random_movie(
    reference: &Raster,
    frame_count: usize,
    seed: Option<u64>,
    supersample: usize,
) -> Result<(Movie, DeformationModel)> {
    if frame_count == 0 {
        return Err(MocorrError::EmptySequence);
    }
    let time_stamps: Vec<f64> = (0..frame_count).map(|i| i as f64).collect();
    let t_max = (frame_count - 1).max(1) as f64;

    let mut model = DeformationModel::new();
    model.randomize_seeded(reference.shape(), t_max, seed)?;
    let movie = synthesize_movie(reference, &model, &time_stamps, supersample)?;
    Ok((movie, model))
}
