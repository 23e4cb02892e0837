use cogex_core::{GenerationError, Side, Stimulus, TaskId, TrialSpec};
use cogex_experiment::sequence::random_side;
use cogex_experiment::{BlockPlan, ConditionTable, Delay, Task, TaskConfig, TrialTiming};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const CONGRUENT: &str = "congruent";
pub const INCONGRUENT: &str = "incongruent";
pub const NEUTRAL: &str = "neutral";

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Flankers {
    /// Point the same way as the target.
    Same,
    Opposite,
    /// Boxes, no direction.
    Boxes,
}

/// Five symbols in a row; the middle arrow is the target.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowRow {
    pub target: Side,
    pub flankers: Flankers,
}

fn arrow(side: Side) -> char {
    match side {
        Side::Left => '←',
        Side::Right => '→',
    }
}

impl Stimulus for ArrowRow {
    fn describe(&self) -> String {
        let flanker = match self.flankers {
            Flankers::Same => arrow(self.target),
            Flankers::Opposite => arrow(self.target.opposite()),
            Flankers::Boxes => '□',
        };
        let target = arrow(self.target);
        format!("{flanker} {flanker} {target} {flanker} {flanker}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Flanker {
    pub config: TaskConfig<()>,
}

impl Default for Flanker {
    fn default() -> Self {
        let timing = TrialTiming {
            fixation: Delay::fixed(500),
            response_window_ms: Some(1500),
            inter_trial: Delay::fixed(1000),
            ..TrialTiming::default()
        };
        let mut blocks = vec![BlockPlan::practice("practice", 10, ())];
        blocks.extend((1..=3).map(|n| BlockPlan::main(format!("block {n}"), 40, ())));
        Self {
            config: TaskConfig::new(timing, blocks),
        }
    }
}

impl Task for Flanker {
    type Stimulus = ArrowRow;
    type Params = ();

    fn id(&self) -> TaskId {
        TaskId::Flanker
    }

    fn config(&self) -> &TaskConfig<()> {
        &self.config
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        block: &BlockPlan<()>,
        rng: &mut R,
    ) -> Result<Vec<TrialSpec<ArrowRow>>, GenerationError> {
        // Congruent first: it takes the remainder.
        let table = ConditionTable::uniform([CONGRUENT, INCONGRUENT, NEUTRAL])?;
        let layout = table.balanced(block.trials, rng);
        Ok(layout
            .into_iter()
            .map(|condition| {
                let target = random_side(rng);
                let flankers = match condition.as_str() {
                    CONGRUENT => Flankers::Same,
                    INCONGRUENT => Flankers::Opposite,
                    _ => Flankers::Boxes,
                };
                TrialSpec::respond(condition, ArrowRow { target, flankers }, target.response())
            })
            .collect())
    }
}
