pub mod config;
mod orchestrator;
mod synthesis;
mod types;

pub use config::{CorrectionConfig, WarpConfig};
pub use orchestrator::run_correction;
pub use synthesis::{synthesize_movie, synthesize_random_movie};
pub use types::{CorrectionOutput, NoOpReporter, PipelineStage, ProgressReporter};
