use cogex_core::BlockKind;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::scoring::Scoring;

/// A fixed or uniformly randomized wait.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum Delay {
    Fixed { ms: u64 },
    Uniform { min_ms: u64, max_ms: u64 },
}

impl Delay {
    pub const ZERO: Delay = Delay::Fixed { ms: 0 };

    pub const fn fixed(ms: u64) -> Self {
        Delay::Fixed { ms }
    }

    pub const fn uniform(min_ms: u64, max_ms: u64) -> Self {
        Delay::Uniform { min_ms, max_ms }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match *self {
            Delay::Fixed { ms } => ms,
            Delay::Uniform { min_ms, max_ms } if min_ms >= max_ms => min_ms,
            Delay::Uniform { min_ms, max_ms } => rng.random_range(min_ms..=max_ms),
        }
    }
}

/// Fixed-duration step between fixation and the response window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseStep {
    /// What the renderer shows during the step (`cue`, `blank`, `problem`, ...).
    pub label: String,
    pub duration_ms: u64,
}

impl PhaseStep {
    pub fn new(label: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            label: label.into(),
            duration_ms,
        }
    }
}

/// What a key press before stimulus onset does.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrematurePolicy {
    /// Ends the trial with a premature outcome.
    Resolve,
    /// Counted on the record, trial keeps running.
    #[default]
    Ignore,
}

/// What a wrong response inside the window does.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorPolicy {
    #[default]
    Resolve,
    /// Counted on the record, window stays open until the correct response.
    Retry,
}

/// Per-trial timing and scoring, shared by every trial of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrialTiming {
    pub fixation: Delay,
    pub steps: Vec<PhaseStep>,
    /// `None` waits for a response indefinitely.
    pub response_window_ms: Option<u64>,
    pub inter_trial: Delay,
    /// Responses faster than this after onset count as premature.
    pub anticipation_ms: Option<u64>,
    pub premature: PrematurePolicy,
    pub errors: ErrorPolicy,
    pub scoring: Scoring,
}

impl Default for TrialTiming {
    fn default() -> Self {
        Self {
            fixation: Delay::uniform(500, 1500),
            steps: Vec::new(),
            response_window_ms: Some(2000),
            inter_trial: Delay::fixed(1000),
            anticipation_ms: None,
            premature: PrematurePolicy::default(),
            errors: ErrorPolicy::default(),
            scoring: Scoring::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPlan<P> {
    pub label: String,
    pub kind: BlockKind,
    pub trials: usize,
    pub params: P,
}

impl<P> BlockPlan<P> {
    pub fn practice(label: impl Into<String>, trials: usize, params: P) -> Self {
        Self {
            label: label.into(),
            kind: BlockKind::Practice,
            trials,
            params,
        }
    }

    pub fn main(label: impl Into<String>, trials: usize, params: P) -> Self {
        Self {
            label: label.into(),
            kind: BlockKind::Main,
            trials,
            params,
        }
    }
}

/// Everything the session controller needs to run one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig<P> {
    pub timing: TrialTiming,
    pub blocks: Vec<BlockPlan<P>>,
    /// Countdown between consecutive main blocks, in seconds. Zero disables it.
    #[serde(default)]
    pub rest_s: u32,
    /// Silent pause before any other next block.
    #[serde(default)]
    pub block_gap_ms: u64,
}

impl<P> TaskConfig<P> {
    pub fn new(timing: TrialTiming, blocks: Vec<BlockPlan<P>>) -> Self {
        Self {
            timing,
            blocks,
            rest_s: 0,
            block_gap_ms: 0,
        }
    }

    pub fn with_rest(mut self, rest_s: u32) -> Self {
        self.rest_s = rest_s;
        self
    }

    pub fn with_block_gap(mut self, block_gap_ms: u64) -> Self {
        self.block_gap_ms = block_gap_ms;
        self
    }

    pub fn total_trials(&self) -> usize {
        self.blocks.iter().map(|block| block.trials).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn uniform_delay_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let delay = Delay::uniform(500, 1000);
        for _ in 0..1_000 {
            let ms = delay.sample(&mut rng);
            assert!((500..=1000).contains(&ms));
        }
    }

    #[test]
    fn degenerate_uniform_delay_is_its_minimum() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(Delay::uniform(300, 300).sample(&mut rng), 300);
        assert_eq!(Delay::uniform(300, 100).sample(&mut rng), 300);
    }

    #[test]
    fn timing_deserializes_from_partial_json() {
        let timing: TrialTiming = serde_json::from_str(
            r#"{ "fixation": { "kind": "fixed", "ms": 250 }, "responseWindowMs": null }"#,
        )
        .unwrap();
        assert_eq!(timing.fixation, Delay::fixed(250));
        assert_eq!(timing.response_window_ms, None);
        assert_eq!(timing.inter_trial, Delay::fixed(1000));
    }
}
