use tracing::{info, warn};

use crate::align::patches::PatchGrid;
use crate::consts::MIN_FIT_OBSERVATIONS;
use crate::deform::DeformationModel;
use crate::error::{MocorrError, Result};
use crate::movie::Movie;

use super::config::CorrectionConfig;
use super::types::{CorrectionOutput, PipelineStage, ProgressReporter};

/// Run motion correction over a whole movie.
///
/// Frames are first aligned globally (in place). With `config.local` set,
/// local shifts are then measured on the patch grid and the deformation
/// model is fitted to them; every frame is finally warped from its own time
/// stamp to the reference time. Too few observations leave the model
/// unfitted and the frames only globally corrected.
pub fn run_correction(
    mut movie: Movie,
    config: &CorrectionConfig,
    reporter: &dyn ProgressReporter,
) -> Result<CorrectionOutput> {
    config.validate()?;
    let Some(shape) = movie.shape() else {
        return Err(MocorrError::EmptySequence);
    };
    info!(frames = movie.len(), height = shape.0, width = shape.1, "starting correction");

    reporter.begin_stage(PipelineStage::GlobalAlignment, Some(movie.len()));
    let global_shifts = movie.correct_global_shift(&config.relaxation)?;
    reporter.finish_stage();

    let mut output = CorrectionOutput {
        global_shifts,
        local_shifts: Vec::new(),
        model: DeformationModel::new(),
        fit: None,
        reference_time: None,
        movie,
    };
    if !config.local {
        return Ok(output);
    }

    reporter.begin_stage(PipelineStage::LocalAlignment, Some(PatchGrid::new(shape).patch_count()));
    output.local_shifts = output.movie.calculate_local_shifts(&config.relaxation)?;
    reporter.finish_stage();

    if output.local_shifts.len() < MIN_FIT_OBSERVATIONS {
        warn!(
            observations = output.local_shifts.len(),
            required = MIN_FIT_OBSERVATIONS,
            "too few local observations to fit the deformation model; skipping warp"
        );
        return Ok(output);
    }

    reporter.begin_stage(PipelineStage::ModelFitting, None);
    output.fit = Some(output.model.fit(&output.local_shifts, &config.fit)?);
    reporter.finish_stage();

    let reference_time = match config.warp.reference_time {
        Some(t) => t,
        None => output.movie.frames()[0].time_stamp,
    };
    let frames = output.movie.len();
    reporter.begin_stage(PipelineStage::Warping, Some(frames));
    for (i, frame) in output.movie.frames_mut().iter_mut().enumerate() {
        frame.raster = output
            .model
            .apply(&frame.raster, frame.time_stamp, reference_time, config.warp.supersample)?;
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    output.reference_time = Some(reference_time);
    info!(reference_time, frames, "correction complete");
    Ok(output)
}
