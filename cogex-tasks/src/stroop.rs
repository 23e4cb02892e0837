use std::fmt;

use cogex_core::{GenerationError, Response, Stimulus, TaskId, TrialSpec};
use cogex_experiment::sequence::{pick, shuffle};
use cogex_experiment::{BlockPlan, Delay, Task, TaskConfig, TrialTiming};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Colour {
    Red,
    Yellow,
    Green,
    Blue,
}

impl Colour {
    pub const ALL: [Colour; 4] = [Colour::Red, Colour::Yellow, Colour::Green, Colour::Blue];

    pub fn name(self) -> &'static str {
        match self {
            Colour::Red => "RED",
            Colour::Yellow => "YELLOW",
            Colour::Green => "GREEN",
            Colour::Blue => "BLUE",
        }
    }

    pub fn response(self) -> Response {
        Response::label(self.name())
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StroopBlock {
    /// Colour words in black ink; name the word.
    Word,
    /// Coloured patches; name the colour.
    Colour,
    /// Colour words in a different ink; name the ink.
    Interference,
}

impl StroopBlock {
    pub fn label(self) -> &'static str {
        match self {
            StroopBlock::Word => "word",
            StroopBlock::Colour => "color",
            StroopBlock::Interference => "interference",
        }
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StroopStimulus {
    Word { word: Colour },
    Patch { ink: Colour },
    Conflict { word: Colour, ink: Colour },
}

impl StroopStimulus {
    /// The colour the participant has to report.
    pub fn answer(&self) -> Colour {
        match *self {
            StroopStimulus::Word { word } => word,
            StroopStimulus::Patch { ink } | StroopStimulus::Conflict { ink, .. } => ink,
        }
    }
}

impl Stimulus for StroopStimulus {
    fn describe(&self) -> String {
        match self {
            StroopStimulus::Word { word } => format!("{word} in black"),
            StroopStimulus::Patch { ink } => format!("{ink} patch"),
            StroopStimulus::Conflict { word, ink } => format!("{word} in {ink}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stroop {
    pub config: TaskConfig<StroopBlock>,
}

impl Default for Stroop {
    fn default() -> Self {
        let timing = TrialTiming {
            fixation: Delay::fixed(500),
            response_window_ms: None,
            inter_trial: Delay::fixed(1000),
            ..TrialTiming::default()
        };
        let blocks = vec![
            BlockPlan::practice("practice", 5, StroopBlock::Word),
            BlockPlan::main("word reading", 12, StroopBlock::Word),
            BlockPlan::main("color naming", 12, StroopBlock::Colour),
            BlockPlan::main("interference", 12, StroopBlock::Interference),
        ];
        Self {
            config: TaskConfig::new(timing, blocks).with_rest(10),
        }
    }
}

impl Task for Stroop {
    type Stimulus = StroopStimulus;
    type Params = StroopBlock;

    fn id(&self) -> TaskId {
        TaskId::Stroop
    }

    fn config(&self) -> &TaskConfig<StroopBlock> {
        &self.config
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        block: &BlockPlan<StroopBlock>,
        rng: &mut R,
    ) -> Result<Vec<TrialSpec<StroopStimulus>>, GenerationError> {
        let mut specs = Vec::with_capacity(block.trials);
        for i in 0..block.trials {
            let word = Colour::ALL[i % Colour::ALL.len()];
            let stimulus = match block.params {
                StroopBlock::Word => StroopStimulus::Word { word },
                StroopBlock::Colour => StroopStimulus::Patch { ink: word },
                StroopBlock::Interference => {
                    let others: Vec<Colour> =
                        Colour::ALL.into_iter().filter(|ink| *ink != word).collect();
                    let ink = *pick(&others, rng)?;
                    StroopStimulus::Conflict { word, ink }
                }
            };
            specs.push(TrialSpec::respond(
                block.params.label(),
                stimulus,
                stimulus.answer().response(),
            ));
        }
        shuffle(&mut specs, rng);
        Ok(specs)
    }
}
