use cogex_core::{GenerationError, Response, Stimulus, TaskId, TrialSpec};
use cogex_experiment::sequence::shuffle;
use cogex_experiment::{BlockPlan, Delay, ErrorPolicy, Task, TaskConfig, TrialTiming};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrailRound {
    /// 1, 2, 3, ...
    Numbers,
    /// 1, A, 2, B, ...
    Alternating,
}

impl TrailRound {
    pub fn label(self) -> &'static str {
        match self {
            TrailRound::Numbers => "numbers",
            TrailRound::Alternating => "alternating",
        }
    }

    /// The first `len` items of the trail, in the order they must be visited.
    pub fn trail(self, len: usize) -> Vec<String> {
        match self {
            TrailRound::Numbers => (1..=len).map(|n| n.to_string()).collect(),
            TrailRound::Alternating => (0..len)
                .map(|i| {
                    let step = i / 2;
                    if i % 2 == 0 {
                        (step + 1).to_string()
                    } else {
                        char::from(b'A' + (step % 26) as u8).to_string()
                    }
                })
                .collect(),
        }
    }
}

/// One item to click next, with the board it sits on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailTarget {
    pub label: String,
    /// Index of `label` on `board`.
    pub position: usize,
    pub board: Vec<String>,
}

impl Stimulus for TrailTarget {
    fn describe(&self) -> String {
        format!("{} at {}", self.label, self.position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrailMaking {
    pub config: TaskConfig<TrailRound>,
}

impl Default for TrailMaking {
    fn default() -> Self {
        let timing = TrialTiming {
            fixation: Delay::ZERO,
            response_window_ms: None,
            inter_trial: Delay::ZERO,
            errors: ErrorPolicy::Retry,
            ..TrialTiming::default()
        };
        Self {
            config: TaskConfig::new(
                timing,
                vec![
                    BlockPlan::practice("practice", 8, TrailRound::Numbers),
                    BlockPlan::main("round A", 25, TrailRound::Numbers),
                    BlockPlan::main("round B", 25, TrailRound::Alternating),
                ],
            ),
        }
    }
}

impl Task for TrailMaking {
    type Stimulus = TrailTarget;
    type Params = TrailRound;

    fn id(&self) -> TaskId {
        TaskId::TrailMaking
    }

    fn config(&self) -> &TaskConfig<TrailRound> {
        &self.config
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        block: &BlockPlan<TrailRound>,
        rng: &mut R,
    ) -> Result<Vec<TrialSpec<TrailTarget>>, GenerationError> {
        let trail = block.params.trail(block.trials);
        // The start item keeps its place; everything else is scattered.
        let mut board = trail.clone();
        if let Some(rest) = board.get_mut(1..) {
            shuffle(rest, rng);
        }
        Ok(trail
            .into_iter()
            .map(|label| {
                let position = board.iter().position(|item| *item == label).unwrap_or(0);
                let response = Response::label(label.clone());
                let target = TrailTarget {
                    label,
                    position,
                    board: board.clone(),
                };
                TrialSpec::respond(block.params.label(), target, response)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn alternating_trail_interleaves_numbers_and_letters() {
        assert_eq!(
            TrailRound::Alternating.trail(6),
            ["1", "A", "2", "B", "3", "C"]
        );
        let full = TrailRound::Alternating.trail(25);
        assert_eq!(full.last().map(String::as_str), Some("13"));
    }

    #[test]
    fn targets_follow_the_trail_and_the_start_stays_first() {
        let task = TrailMaking::default();
        let block = &task.config.blocks[2];
        let specs = task.generate(block, &mut StdRng::seed_from_u64(8)).unwrap();
        let labels: Vec<_> = specs.iter().map(|s| s.stimulus.label.clone()).collect();
        assert_eq!(labels, TrailRound::Alternating.trail(25));
        assert_eq!(specs[0].stimulus.position, 0);
        for spec in &specs {
            assert_eq!(spec.stimulus.board[spec.stimulus.position], spec.stimulus.label);
            assert_eq!(spec.stimulus.board.len(), 25);
        }
    }

    #[test]
    fn wrong_clicks_are_retried() {
        assert_eq!(TrailMaking::default().config.timing.errors, ErrorPolicy::Retry);
    }
}
