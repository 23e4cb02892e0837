use cogex_core::{GenerationError, Side, Stimulus, TaskId, TrialSpec};
use cogex_experiment::sequence::{coin, pick, random_side};
use cogex_experiment::{BlockPlan, Delay, PhaseStep, Task, TaskConfig, TrialTiming};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const ADDITION: &str = "addition";
pub const SUBTRACTION: &str = "subtraction";

/// Where the left operand is drawn from.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperandRange {
    /// 20 to 69.
    Training,
    /// Half two-digit (10 to 99), half three-digit (100 to 999).
    Mixed,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Add,
    Subtract,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub base: i64,
    pub operation: Operation,
    pub operand: i64,
    pub answer: i64,
    pub left: i64,
    pub right: i64,
}

impl Problem {
    pub fn correct_side(&self) -> Side {
        if self.left == self.answer { Side::Left } else { Side::Right }
    }
}

impl Stimulus for Problem {
    fn describe(&self) -> String {
        let sign = match self.operation {
            Operation::Add => '+',
            Operation::Subtract => '-',
        };
        format!("{} {sign} {} | {} or {}", self.base, self.operand, self.left, self.right)
    }
}

/// Picks a wrong answer near `correct`. Candidates must stay positive and differ
/// from `correct`; when none does, the problem cannot be posed.
pub fn distractor<R: Rng + ?Sized>(
    correct: i64,
    offsets: &[i64],
    rng: &mut R,
) -> Result<i64, GenerationError> {
    let candidates: Vec<i64> = offsets
        .iter()
        .map(|offset| correct + offset)
        .filter(|candidate| *candidate > 0 && *candidate != correct)
        .collect();
    pick(&candidates, rng)
        .copied()
        .map_err(|_| GenerationError::NoDistractor { correct })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MentalArithmetic {
    pub config: TaskConfig<OperandRange>,
    pub operand: i64,
    pub distractor_offsets: Vec<i64>,
}

impl Default for MentalArithmetic {
    fn default() -> Self {
        let timing = TrialTiming {
            fixation: Delay::ZERO,
            steps: vec![
                PhaseStep::new("problem", 1000),
                PhaseStep::new("computation", 4000),
            ],
            response_window_ms: Some(1000),
            inter_trial: Delay::fixed(1200),
            ..TrialTiming::default()
        };
        Self {
            config: TaskConfig::new(
                timing,
                vec![
                    BlockPlan::practice("practice", 5, OperandRange::Training),
                    BlockPlan::main("main", 45, OperandRange::Mixed),
                ],
            ),
            operand: 17,
            distractor_offsets: vec![10, -10, 20, -20, 17, -17, 1, -1],
        }
    }
}

impl MentalArithmetic {
    fn problem<R: Rng + ?Sized>(
        &self,
        range: OperandRange,
        rng: &mut R,
    ) -> Result<Problem, GenerationError> {
        let operation = if coin(rng, 0.5) { Operation::Add } else { Operation::Subtract };
        let mut base = match range {
            OperandRange::Training => rng.random_range(20..=69),
            OperandRange::Mixed if coin(rng, 0.5) => rng.random_range(10..=99),
            OperandRange::Mixed => rng.random_range(100..=999),
        };
        let answer = match operation {
            Operation::Add => base + self.operand,
            Operation::Subtract => {
                if base < self.operand {
                    base += self.operand;
                }
                base - self.operand
            }
        };
        let wrong = distractor(answer, &self.distractor_offsets, rng)?;
        let (left, right) = match random_side(rng) {
            Side::Left => (answer, wrong),
            Side::Right => (wrong, answer),
        };
        Ok(Problem {
            base,
            operation,
            operand: self.operand,
            answer,
            left,
            right,
        })
    }
}

impl Task for MentalArithmetic {
    type Stimulus = Problem;
    type Params = OperandRange;

    fn id(&self) -> TaskId {
        TaskId::MentalArithmetic
    }

    fn config(&self) -> &TaskConfig<OperandRange> {
        &self.config
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        block: &BlockPlan<OperandRange>,
        rng: &mut R,
    ) -> Result<Vec<TrialSpec<Problem>>, GenerationError> {
        (0..block.trials)
            .map(|_| -> Result<TrialSpec<Problem>, GenerationError> {
                let problem = self.problem(block.params, rng)?;
                let condition = match problem.operation {
                    Operation::Add => ADDITION,
                    Operation::Subtract => SUBTRACTION,
                };
                Ok(TrialSpec::respond(condition, problem, problem.correct_side().response()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::Expected;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn no_distractor_when_every_offset_collapses() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            distractor(1, &[-1, -10, -17, -20], &mut rng),
            Err(GenerationError::NoDistractor { correct: 1 })
        );
        assert_eq!(
            distractor(5, &[0], &mut rng),
            Err(GenerationError::NoDistractor { correct: 5 })
        );
    }

    #[test]
    fn small_answers_only_get_positive_distractors() {
        let task = MentalArithmetic::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let wrong = distractor(1, &task.distractor_offsets, &mut rng).unwrap();
            assert!(wrong > 0 && wrong != 1);
        }
    }

    #[test]
    fn problems_are_consistent() {
        let task = MentalArithmetic::default();
        for block in &task.config.blocks {
            let specs = task.generate(block, &mut StdRng::seed_from_u64(2)).unwrap();
            assert_eq!(specs.len(), block.trials);
            for spec in specs {
                let p = spec.stimulus;
                let expected = match p.operation {
                    Operation::Add => p.base + p.operand,
                    Operation::Subtract => p.base - p.operand,
                };
                assert_eq!(p.answer, expected);
                assert!(p.answer >= 0);
                assert_ne!(p.left, p.right);
                assert!(p.left == p.answer || p.right == p.answer);
                assert_eq!(spec.expected, Expected::Respond(p.correct_side().response()));
                if block.params == OperandRange::Training {
                    assert!((20..=69).contains(&p.base));
                }
            }
        }
    }
}
