use cogex_core::{Expected, Outcome, Response};
use serde::{Deserialize, Serialize};

/// Scoring taxonomy for a task.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scoring {
    /// Hit / miss / false alarm / correct rejection. For tasks with catch trials.
    SignalDetection,
    /// Correct / incorrect / timed out.
    #[default]
    Choice,
}

impl Scoring {
    /// Classifies a trial that was not cut short as premature.
    pub fn classify(&self, expected: &Expected, observed: Option<&Response>) -> Outcome {
        match (expected, observed) {
            (Expected::Withhold, Some(_)) => Outcome::FalseAlarm,
            (Expected::Withhold, None) => Outcome::CorrectRejection,
            (Expected::Respond(want), Some(got)) => match self {
                Scoring::SignalDetection if want == got => Outcome::Hit,
                Scoring::Choice if want == got => Outcome::Correct,
                _ => Outcome::Incorrect,
            },
            (Expected::Respond(_), None) => match self {
                Scoring::SignalDetection => Outcome::Miss,
                Scoring::Choice => Outcome::TimedOut,
            },
        }
    }
}
