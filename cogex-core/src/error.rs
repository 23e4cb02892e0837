use thiserror::Error;

/// Sequence parameters that cannot produce a valid block. Fatal to the task.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("condition table is empty")]
    EmptyConditionTable,
    #[error("condition weights must be non-negative and sum to 1.0, got {sum}")]
    InvalidWeights { sum: f64 },
    #[error("no valid distractor exists for correct answer {correct}")]
    NoDistractor { correct: i64 },
    #[error("constraint still unsatisfied after {attempts} draws")]
    ConstraintUnsatisfied { attempts: u32 },
    #[error("{requested} items requested but only {available} are available")]
    ItemPoolExhausted { requested: usize, available: usize },
    #[error("block `{label}` has no trials")]
    EmptyBlock { label: String },
    #[error("block `{label}` wants {expected} trials but {actual} were generated")]
    TrialCountMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },
    #[error("task has no blocks")]
    NoBlocks,
}

/// Caller broke the engine's protocol. Continuing would corrupt trial indexing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("trial {serial} is still in progress")]
    TrialInProgress { serial: u64 },
    #[error("no trial is active")]
    NoActiveTrial,
    #[error("session was already started")]
    AlreadyStarted,
    #[error("session has not been started")]
    NotStarted,
    #[error("task was already completed")]
    AlreadyCompleted,
    #[error("{remaining} block(s) still to run")]
    BlocksRemaining { remaining: usize },
    #[error("session halted after a fatal error")]
    Halted,
}
