use cogex_core::{GenerationError, Stimulus, TaskId, TrialSpec};
use rand::Rng;

use crate::config::{BlockPlan, TaskConfig};

/// A paradigm: its timing plus a generator for each block's trials.
pub trait Task {
    type Stimulus: Stimulus;
    /// Per-block generation parameters.
    type Params;

    fn id(&self) -> TaskId;

    fn config(&self) -> &TaskConfig<Self::Params>;

    /// Produces exactly `block.trials` specs, or an error.
    fn generate<R: Rng + ?Sized>(
        &self,
        block: &BlockPlan<Self::Params>,
        rng: &mut R,
    ) -> Result<Vec<TrialSpec<Self::Stimulus>>, GenerationError>;
}
