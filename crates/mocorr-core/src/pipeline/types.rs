use crate::deform::{DeformationModel, FitReport};
use crate::frame::{LocalObservation, ShiftEstimate};
use crate::movie::Movie;

/// Processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    GlobalAlignment,
    LocalAlignment,
    ModelFitting,
    Warping,
    Synthesis,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GlobalAlignment => write!(f, "Aligning frames"),
            Self::LocalAlignment => write!(f, "Estimating local motion"),
            Self::ModelFitting => write!(f, "Fitting deformation model"),
            Self::Warping => write!(f, "Warping frames"),
            Self::Synthesis => write!(f, "Synthesizing frames"),
        }
    }
}

/// Everything a correction run produced.
#[derive(Clone, Debug)]
pub struct CorrectionOutput {
    /// Whole-frame shifts, in movie order.
    pub global_shifts: Vec<ShiftEstimate>,
    /// Per-patch shifts; empty when local estimation is disabled.
    pub local_shifts: Vec<LocalObservation>,
    /// Unfitted when there were too few observations.
    pub model: DeformationModel,
    pub fit: Option<FitReport>,
    /// Reference time the frames were warped to, when a warp happened.
    pub reference_time: Option<f64>,
    pub movie: Movie,
}

/// Thread-safe progress reporting.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A stage has started. `total_items` is the number of work items in
    /// this stage, if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// Work items completed so far within the current stage.
    fn advance(&self, _items_done: usize) {}

    fn finish_stage(&self) {}
}

pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
