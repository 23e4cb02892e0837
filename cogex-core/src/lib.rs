pub mod error;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use error::{ContractError, GenerationError};
pub use phase::{BlockKind, TaskId};
pub use stimulus::{Condition, Expected, Response, Side, Stimulus, TrialSpec};
pub use trial::{Observed, Outcome, TrialRecord, TrialState};
