//! Letter n-back.
//!
//! 0-back: press for the target letter. n-back: press when the letter equals
//! the one `n` positions earlier. The first `n` letters of an n-back block
//! have nothing to match and are always non-targets. Target positions are
//! placed by quota so a block carries a fixed number of targets.

use cogex_core::{GenerationError, Response, Stimulus, TaskId, TrialSpec};
use cogex_experiment::sequence::draw_until;
use cogex_experiment::{
    BlockPlan, ConditionTable, Delay, PrematurePolicy, Scoring, Task, TaskConfig, TrialTiming,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

pub const TARGET: &str = "target";
pub const NON_TARGET: &str = "non-target";

/// No vowels besides A and E, and no I, M, O, U, V, W.
pub const LETTERS: [char; 20] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'N', 'P', 'Q', 'R', 'S', 'T', 'X',
    'Y', 'Z',
];

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Letter {
    pub letter: char,
    /// Load of the block the letter belongs to.
    pub n: usize,
}

impl Stimulus for Letter {
    fn describe(&self) -> String {
        self.letter.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NBack {
    /// Block params are the `n` of each block.
    pub config: TaskConfig<usize>,
    pub target_probability: f64,
    pub zero_back_target: char,
}

impl Default for NBack {
    fn default() -> Self {
        let timing = TrialTiming {
            fixation: Delay::fixed(500),
            response_window_ms: Some(500),
            inter_trial: Delay::ZERO,
            premature: PrematurePolicy::Ignore,
            scoring: Scoring::SignalDetection,
            ..TrialTiming::default()
        };
        let blocks = vec![
            BlockPlan::practice("0-back practice", 10, 0),
            BlockPlan::main("0-back", 30, 0),
            BlockPlan::main("2-back", 30, 2),
            BlockPlan::main("3-back", 30, 3),
        ];
        Self {
            config: TaskConfig::new(timing, blocks).with_rest(30),
            target_probability: 0.3,
            zero_back_target: 'X',
        }
    }
}

fn random_letter<R: Rng + ?Sized>(rng: &mut R) -> char {
    LETTERS[rng.random_range(0..LETTERS.len())]
}

impl Task for NBack {
    type Stimulus = Letter;
    type Params = usize;

    fn id(&self) -> TaskId {
        TaskId::NBack
    }

    fn config(&self) -> &TaskConfig<usize> {
        &self.config
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        block: &BlockPlan<usize>,
        rng: &mut R,
    ) -> Result<Vec<TrialSpec<Letter>>, GenerationError> {
        let n = block.params;
        let lead_in = n.min(block.trials);
        let table = ConditionTable::new([
            (TARGET, self.target_probability),
            (NON_TARGET, 1.0 - self.target_probability),
        ])?;
        let layout = table.quota(block.trials - lead_in, rng);

        let mut letters: Vec<char> = Vec::with_capacity(block.trials);
        let mut specs = Vec::with_capacity(block.trials);
        for _ in 0..lead_in {
            let letter = random_letter(rng);
            letters.push(letter);
            specs.push(TrialSpec::withhold(NON_TARGET, Letter { letter, n }));
        }
        for condition in layout {
            let target = condition.as_str() == TARGET;
            let letter = match (n, target) {
                (0, true) => self.zero_back_target,
                (0, false) => {
                    let avoid = self.zero_back_target;
                    draw_until(rng, random_letter, |letter| *letter != avoid)?
                }
                (_, true) => letters[letters.len() - n],
                (_, false) => {
                    let avoid = letters[letters.len() - n];
                    draw_until(rng, random_letter, |letter| *letter != avoid)?
                }
            };
            letters.push(letter);
            let stimulus = Letter { letter, n };
            specs.push(if target {
                TrialSpec::respond(condition, stimulus, Response::Space)
            } else {
                TrialSpec::withhold(condition, stimulus)
            });
        }
        trace!(
            block = %block.label,
            n,
            targets = specs.iter().filter(|spec| !spec.is_catch()).count(),
            "n-back sequence generated"
        );
        Ok(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn targets(specs: &[TrialSpec<Letter>]) -> usize {
        specs.iter().filter(|s| s.condition.as_str() == TARGET).count()
    }

    #[test]
    fn zero_back_block_has_nine_targets_in_thirty() {
        let task = NBack::default();
        for seed in 0..10 {
            let specs = task
                .generate(&task.config.blocks[1], &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert_eq!(specs.len(), 30);
            assert_eq!(targets(&specs), 9);
            for spec in &specs {
                let is_x = spec.stimulus.letter == 'X';
                assert_eq!(is_x, spec.condition.as_str() == TARGET);
            }
        }
    }

    #[test]
    fn targets_repeat_the_letter_n_back_and_others_do_not() {
        let task = NBack::default();
        for block in &task.config.blocks[2..] {
            let n = block.params;
            let specs = task.generate(block, &mut StdRng::seed_from_u64(n as u64)).unwrap();
            assert_eq!(specs.len(), 30);
            assert_eq!(targets(&specs), 8, "quota of {} eligible", 30 - n);
            for (i, spec) in specs.iter().enumerate().skip(n) {
                let repeats = spec.stimulus.letter == specs[i - n].stimulus.letter;
                assert_eq!(repeats, spec.condition.as_str() == TARGET, "position {i}");
            }
            assert!(specs[..n].iter().all(|s| s.is_catch()));
        }
    }

    #[test]
    fn targets_expect_a_press() {
        let task = NBack::default();
        let specs = task
            .generate(&task.config.blocks[0], &mut StdRng::seed_from_u64(4))
            .unwrap();
        for spec in specs {
            assert_eq!(spec.is_catch(), spec.condition.as_str() == NON_TARGET);
        }
    }
}
