use cogex_core::{ContractError, GenerationError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("sequence generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("contract violation: {0}")]
    Contract(#[from] ContractError),
}
