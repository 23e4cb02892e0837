use cogex_core::{GenerationError, Side, Stimulus, TaskId, TrialSpec};
use cogex_experiment::sequence::random_side;
use cogex_experiment::{BlockPlan, ConditionTable, Delay, PhaseStep, Task, TaskConfig, TrialTiming};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const VALID: &str = "valid";
pub const INVALID: &str = "invalid";
pub const NEUTRAL: &str = "neutral";

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cue {
    Left,
    Right,
    /// Both boxes highlighted; carries no spatial information.
    Both,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CueTarget {
    pub cue: Cue,
    pub target: Side,
}

impl Stimulus for CueTarget {
    fn describe(&self) -> String {
        format!("cue {:?}, target {:?}", self.cue, self.target).to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Posner {
    pub config: TaskConfig<()>,
    pub valid_probability: f64,
    pub invalid_probability: f64,
    pub neutral_probability: f64,
}

impl Default for Posner {
    fn default() -> Self {
        let timing = TrialTiming {
            fixation: Delay::uniform(500, 1000),
            steps: vec![PhaseStep::new("cue", 100), PhaseStep::new("interval", 100)],
            response_window_ms: Some(1500),
            inter_trial: Delay::fixed(1000),
            ..TrialTiming::default()
        };
        let mut blocks = vec![BlockPlan::practice("practice", 12, ())];
        blocks.extend((1..=3).map(|n| BlockPlan::main(format!("block {n}"), 40, ())));
        Self {
            config: TaskConfig::new(timing, blocks),
            valid_probability: 0.8,
            invalid_probability: 0.1,
            neutral_probability: 0.1,
        }
    }
}

impl Task for Posner {
    type Stimulus = CueTarget;
    type Params = ();

    fn id(&self) -> TaskId {
        TaskId::Posner
    }

    fn config(&self) -> &TaskConfig<()> {
        &self.config
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        block: &BlockPlan<()>,
        rng: &mut R,
    ) -> Result<Vec<TrialSpec<CueTarget>>, GenerationError> {
        let table = ConditionTable::new([
            (VALID, self.valid_probability),
            (INVALID, self.invalid_probability),
            (NEUTRAL, self.neutral_probability),
        ])?;
        let conditions = table.sample(block.trials, rng);
        Ok(conditions
            .into_iter()
            .map(|condition| {
                let target = random_side(rng);
                let cue = match condition.as_str() {
                    VALID => side_cue(target),
                    INVALID => side_cue(target.opposite()),
                    _ => Cue::Both,
                };
                TrialSpec::respond(condition, CueTarget { cue, target }, target.response())
            })
            .collect())
    }
}

fn side_cue(side: Side) -> Cue {
    match side {
        Side::Left => Cue::Left,
        Side::Right => Cue::Right,
    }
}
