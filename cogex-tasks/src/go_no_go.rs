use cogex_core::{GenerationError, Response, Stimulus, TaskId, TrialSpec};
use cogex_experiment::{
    BlockPlan, ConditionTable, Delay, PrematurePolicy, Scoring, Task, TaskConfig, TrialTiming,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const GO: &str = "go";
pub const NO_GO: &str = "nogo";

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Square {
    /// Press.
    Orange,
    /// Withhold.
    Blue,
}

impl Stimulus for Square {
    fn describe(&self) -> String {
        match self {
            Square::Orange => "orange square".into(),
            Square::Blue => "blue square".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoNoGo {
    pub config: TaskConfig<()>,
    pub go_probability: f64,
}

impl Default for GoNoGo {
    fn default() -> Self {
        let timing = TrialTiming {
            fixation: Delay::uniform(500, 1000),
            steps: Vec::new(),
            response_window_ms: Some(1000),
            inter_trial: Delay::uniform(500, 1500),
            anticipation_ms: None,
            premature: PrematurePolicy::Resolve,
            errors: Default::default(),
            scoring: Scoring::SignalDetection,
        };
        Self {
            config: TaskConfig::new(
                timing,
                vec![
                    BlockPlan::practice("practice", 10, ()),
                    BlockPlan::main("block 1", 30, ()),
                    BlockPlan::main("block 2", 30, ()),
                ],
            ),
            go_probability: 0.7,
        }
    }
}

impl Task for GoNoGo {
    type Stimulus = Square;
    type Params = ();

    fn id(&self) -> TaskId {
        TaskId::GoNoGo
    }

    fn config(&self) -> &TaskConfig<()> {
        &self.config
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        block: &BlockPlan<()>,
        rng: &mut R,
    ) -> Result<Vec<TrialSpec<Square>>, GenerationError> {
        let table = ConditionTable::new([
            (GO, self.go_probability),
            (NO_GO, 1.0 - self.go_probability),
        ])?;
        let specs: Vec<_> = table
            .sample(block.trials, rng)
            .into_iter()
            .map(|condition| {
                if condition.as_str() == GO {
                    TrialSpec::respond(condition, Square::Orange, Response::Space)
                } else {
                    TrialSpec::withhold(condition, Square::Blue)
                }
            })
            .collect();
        trace!(
            block = %block.label,
            go = specs.iter().filter(|spec| !spec.is_catch()).count(),
            trials = specs.len(),
            "go/no-go sequence generated"
        );
        Ok(specs)
    }
}
