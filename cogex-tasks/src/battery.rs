use cogex_core::TaskId;
use serde::{Deserialize, Serialize};

use crate::{Flanker, GoNoGo, MentalArithmetic, NBack, Posner, Pvt, Stroop, TrailMaking};

/// Order in which a full session runs the tasks. Flanker is available but not scheduled.
pub const DEFAULT_ORDER: [TaskId; 7] = [
    TaskId::GoNoGo,
    TaskId::MentalArithmetic,
    TaskId::Pvt,
    TaskId::Stroop,
    TaskId::NBack,
    TaskId::TrailMaking,
    TaskId::Posner,
];

/// Settings for every task, keyed by export id. Missing entries keep their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Battery {
    pub gng: GoNoGo,
    pub flanker: Flanker,
    pub stroop: Stroop,
    pub nback: NBack,
    pub posner: Posner,
    pub mat: MentalArithmetic,
    pub pvt: Pvt,
    #[serde(rename = "trailMaking")]
    pub trail_making: TrailMaking,
}
