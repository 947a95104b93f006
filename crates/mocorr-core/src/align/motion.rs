use ndarray::Array2;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{MocorrError, Result};
use crate::frame::{LocalObservation, ShiftEstimate};
use crate::movie::Movie;

use super::patches::PatchGrid;
use super::relaxation::{relative_shifts, RelaxationConfig, RelaxationResult};
use super::translate::translate;

/// Align whole frames against the sum of all other frames and rewrite each
/// frame's pixels, translated by the negative of its accumulated shift.
///
/// Returns one shift per frame, in movie order.
pub fn correct_global_shift(movie: &mut Movie, config: &RelaxationConfig) -> Result<Vec<ShiftEstimate>> {
    if movie.is_empty() {
        return Ok(Vec::new());
    }

    let mut raw: Vec<Array2<f32>> = movie.frames().iter().map(|f| f.raster.data.clone()).collect();
    let result = relative_shifts(&mut raw, config)?;
    log_outcome("global", &result);

    for (frame, shift) in movie.frames_mut().iter_mut().zip(&result.shifts) {
        frame.raster.data = translate(&frame.raster.data, -shift.dy, -shift.dx);
    }

    Ok(result.shifts)
}

/// Estimate local motion on the fixed patch grid.
///
/// Each patch position is stacked across all frames and relaxed on its own.
/// Observations are ordered by frame, then by row-major patch index, and are
/// located at the patch centers.
pub fn calculate_local_shifts(movie: &Movie, config: &RelaxationConfig) -> Result<Vec<LocalObservation>> {
    let Some(shape) = movie.shape() else {
        return Ok(Vec::new());
    };
    // `add_unchecked` can leave mixed shapes behind; patches are cut on the first frame's grid.
    if let Some(bad) = movie.frames().iter().find(|f| f.shape() != shape) {
        return Err(MocorrError::ShapeMismatch {
            expected: shape,
            actual: bad.shape(),
        });
    }
    let grid = PatchGrid::new(shape);

    // [frame][patch] -> [patch][frame]
    let partitioned: Vec<Vec<Array2<f32>>> = movie
        .frames()
        .iter()
        .map(|f| grid.partition(&f.raster.data))
        .collect();
    let mut stacks: Vec<Vec<Array2<f32>>> = (0..grid.patch_count())
        .map(|p| partitioned.iter().map(|patches| patches[p].clone()).collect())
        .collect();
    drop(partitioned);

    let results: Vec<Result<RelaxationResult>> = stacks
        .par_iter_mut()
        .map(|stack| relative_shifts(stack, config))
        .collect();
    let results = results.into_iter().collect::<Result<Vec<_>>>()?;

    let unconverged = results.iter().filter(|r| !r.converged).count();
    if unconverged > 0 {
        warn!(
            patches = unconverged,
            "local relaxation hit the iteration cap; shifts may be under-corrected"
        );
    }
    info!(
        patches = grid.patch_count(),
        frames = movie.len(),
        "local shifts estimated"
    );

    let mut observations = Vec::with_capacity(movie.len() * grid.patch_count());
    for (frame_index, frame) in movie.frames().iter().enumerate() {
        for (patch_index, bounds) in grid.iter().enumerate() {
            let (row, col) = bounds.center();
            observations.push(LocalObservation {
                row: row as f64,
                col: col as f64,
                time_stamp: frame.time_stamp,
                frame_index,
                patch_index,
                shift: results[patch_index].shifts[frame_index],
            });
        }
    }

    Ok(observations)
}

fn log_outcome(scope: &str, result: &RelaxationResult) {
    if result.converged {
        info!(scope, iterations = result.iterations, "relaxation converged");
    } else {
        warn!(
            scope,
            iterations = result.iterations,
            "relaxation hit the iteration cap; shifts may be under-corrected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn square_frame(top: usize, left: usize, t: f64) -> Frame {
        let mut data = Array2::<f32>::zeros((15, 15));
        for r in top..top + 4 {
            for c in left..left + 4 {
                data[[r, c]] = 1.0;
            }
        }
        Frame::from_array(data, t)
    }

    #[test]
    fn global_correction_aligns_frames_in_place() {
        let mut movie = Movie::from_frames([
            square_frame(7, 7, 0.0),
            square_frame(3, 7, 1.0),
            square_frame(7, 3, 2.0),
            square_frame(2, 1, 3.0),
        ])
        .unwrap();

        let shifts = correct_global_shift(&mut movie, &RelaxationConfig::default()).unwrap();
        assert_eq!(shifts.len(), 4);

        let total = movie.sum_frames().unwrap();
        assert_eq!(total.data.iter().filter(|&&v| v == 4.0).count(), 16);
        assert!(total.data.iter().all(|&v| v == 4.0 || v.abs() < 1e-6));
    }

    #[test]
    fn global_correction_of_empty_movie_is_a_no_op() {
        let mut movie = Movie::new();
        assert!(correct_global_shift(&mut movie, &RelaxationConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn local_estimation_rejects_mixed_frame_shapes() {
        let mut movie = Movie::new();
        movie.add_unchecked(square_frame(5, 5, 0.0));
        movie.add_unchecked(Frame::from_array(Array2::zeros((10, 15)), 1.0));

        let err = calculate_local_shifts(&movie, &RelaxationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            MocorrError::ShapeMismatch {
                expected: (15, 15),
                actual: (10, 15)
            }
        ));
    }

    #[test]
    fn local_observations_cover_every_patch_of_every_frame() {
        let movie = Movie::from_frames([
            square_frame(5, 5, 0.0),
            square_frame(5, 6, 1.0),
            square_frame(6, 5, 2.0),
        ])
        .unwrap();
        let observations = calculate_local_shifts(&movie, &RelaxationConfig::default()).unwrap();
        assert_eq!(observations.len(), 75);

        // frame-major, then row-major patch order
        assert_eq!(observations[0].frame_index, 0);
        assert_eq!(observations[24].patch_index, 24);
        assert_eq!(observations[25].frame_index, 1);
        assert_eq!(observations[25].patch_index, 0);
        assert_eq!(observations[26].time_stamp, 1.0);

        // 15 px => bands of 3 => centers at 1, 4, 7, 10, 13
        assert_eq!((observations[0].row, observations[0].col), (1.0, 1.0));
        assert_eq!((observations[7].row, observations[7].col), (4.0, 7.0));
    }
}
