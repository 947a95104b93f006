pub mod cross_correlation;
pub mod motion;
pub mod patches;
pub mod relaxation;
pub mod translate;

pub use cross_correlation::compute_shift;
pub use motion::{calculate_local_shifts, correct_global_shift};
pub use patches::{band_sizes, PatchBounds, PatchGrid};
pub use relaxation::{relative_shifts, RelaxationConfig, RelaxationMode, RelaxationResult};
pub use translate::translate;
