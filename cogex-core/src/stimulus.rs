use std::fmt;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

/// Task-specific stimulus content carried by a trial.
pub trait Stimulus: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Short human-readable form, used in logs and by renderers.
    fn describe(&self) -> String;
}

/// Normalized response signal. Raw key codes never reach the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Response {
    Space,
    Left,
    Right,
    /// Named choices: Stroop colors, trail-making items.
    Label(String),
}

impl Response {
    pub fn label(value: impl Into<String>) -> Self {
        Response::Label(value.into())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Space => f.write_str("space"),
            Response::Left => f.write_str("left"),
            Response::Right => f.write_str("right"),
            Response::Label(value) => f.write_str(value),
        }
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn response(self) -> Response {
        match self {
            Side::Left => Response::Left,
            Side::Right => Response::Right,
        }
    }
}

/// What the participant is supposed to do on a trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Expected {
    Respond(Response),
    /// Catch / no-go trial: the correct behavior is to withhold.
    Withhold,
}

impl Expected {
    pub fn matches(&self, response: &Response) -> bool {
        match self {
            Expected::Respond(expected) => expected == response,
            Expected::Withhold => false,
        }
    }

    pub fn is_withhold(&self) -> bool {
        matches!(self, Expected::Withhold)
    }
}

/// Experimental condition label (congruent, valid, target, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Condition(String);

impl Condition {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Condition {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One pre-generated trial. Immutable once the block's sequence exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSpec<S> {
    pub condition: Condition,
    pub stimulus: S,
    pub expected: Expected,
}

impl<S> TrialSpec<S> {
    pub fn new(condition: impl Into<Condition>, stimulus: S, expected: Expected) -> Self {
        Self {
            condition: condition.into(),
            stimulus,
            expected,
        }
    }

    pub fn respond(condition: impl Into<Condition>, stimulus: S, response: Response) -> Self {
        Self::new(condition, stimulus, Expected::Respond(response))
    }

    pub fn withhold(condition: impl Into<Condition>, stimulus: S) -> Self {
        Self::new(condition, stimulus, Expected::Withhold)
    }

    pub fn is_catch(&self) -> bool {
        self.expected.is_withhold()
    }
}
