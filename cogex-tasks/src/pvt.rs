use cogex_core::{GenerationError, Response, Stimulus, TaskId, TrialSpec};
use cogex_experiment::{BlockPlan, Delay, PrematurePolicy, Task, TaskConfig, TrialTiming};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const VIGILANCE: &str = "vigilance";

/// The millisecond counter that appears after an unpredictable wait.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counter;

impl Stimulus for Counter {
    fn describe(&self) -> String {
        "counter".into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pvt {
    pub config: TaskConfig<()>,
}

impl Default for Pvt {
    fn default() -> Self {
        let timing = TrialTiming {
            fixation: Delay::uniform(1000, 3000),
            response_window_ms: Some(1000),
            inter_trial: Delay::uniform(2000, 10_000),
            anticipation_ms: Some(100),
            // A press before the counter appears is a false start; the wait goes on.
            premature: PrematurePolicy::Ignore,
            ..TrialTiming::default()
        };
        Self {
            config: TaskConfig::new(
                timing,
                vec![
                    BlockPlan::practice("practice", 5, ()),
                    BlockPlan::main("block 1", 10, ()),
                    BlockPlan::main("block 2", 10, ()),
                ],
            ),
        }
    }
}

impl Task for Pvt {
    type Stimulus = Counter;
    type Params = ();

    fn id(&self) -> TaskId {
        TaskId::Pvt
    }

    fn config(&self) -> &TaskConfig<()> {
        &self.config
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        block: &BlockPlan<()>,
        _rng: &mut R,
    ) -> Result<Vec<TrialSpec<Counter>>, GenerationError> {
        Ok(vec![TrialSpec::respond(VIGILANCE, Counter, Response::Space); block.trials])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn every_trial_is_a_plain_reaction() {
        let task = Pvt::default();
        let specs = task
            .generate(&task.config.blocks[1], &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(specs.len(), 10);
        assert!(specs.iter().all(|s| s.condition.as_str() == VIGILANCE && !s.is_catch()));
    }

    #[test]
    fn waits_are_unpredictable() {
        let timing = &Pvt::default().config.timing;
        assert_eq!(timing.fixation, Delay::uniform(1000, 3000));
        assert_eq!(timing.anticipation_ms, Some(100));
        assert_eq!(timing.premature, PrematurePolicy::Ignore);
    }
}
