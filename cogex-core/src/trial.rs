use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::stimulus::{Condition, Response};

/// Trial state machine states
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrialState {
    #[default]
    Idle,
    Fixation,
    /// Extra pre-stimulus step (cue, inter-stimulus blank, problem display), by index.
    Phase(usize),
    ResponseWindow,
    InterTrial,
    BlockComplete,
}

impl TrialState {
    pub fn is_pre_onset(&self) -> bool {
        matches!(self, TrialState::Fixation | TrialState::Phase(_))
    }
}

/// How a trial was scored.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Hit,
    Miss,
    FalseAlarm,
    CorrectRejection,
    Correct,
    Incorrect,
    TimedOut,
    /// Response before stimulus onset, or faster than the anticipation threshold.
    Premature,
}

impl Outcome {
    pub fn is_correct(&self) -> bool {
        matches!(
            self,
            Outcome::Hit | Outcome::CorrectRejection | Outcome::Correct
        )
    }
}

/// What the participant did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Observed {
    Responded(Response),
    Timeout,
}

impl Observed {
    pub fn response(&self) -> Option<&Response> {
        match self {
            Observed::Responded(response) => Some(response),
            Observed::Timeout => None,
        }
    }
}

/// Recorded result per trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord<S> {
    /// 1-based, monotonic within the block.
    pub trial_number: usize,
    /// 1-based block number within the task.
    pub block: usize,
    pub is_practice: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub condition: Condition,
    pub response: Observed,
    pub outcome: Outcome,
    pub is_correct: bool,
    /// Measured from stimulus onset; present iff a response landed inside the open window.
    #[serde(rename = "reactionTime", default, skip_serializing_if = "Option::is_none")]
    pub reaction_time_ms: Option<u64>,
    /// Pre-onset presses that were ignored rather than ending the trial.
    #[serde(default)]
    pub early_presses: u32,
    /// Wrong responses absorbed while the trial stayed open.
    #[serde(default)]
    pub errors: u32,
    pub stimulus: S,
}

impl<S> TrialRecord<S> {
    pub fn responded(&self) -> bool {
        self.response.response().is_some()
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.response, Observed::Timeout)
    }
}
