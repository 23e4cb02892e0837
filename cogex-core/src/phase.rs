use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a block counts toward the task's results.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    #[default]
    Practice,
    Main,
}

impl BlockKind {
    pub fn is_practice(&self) -> bool {
        matches!(self, BlockKind::Practice)
    }

    pub fn is_main(&self) -> bool {
        matches!(self, BlockKind::Main)
    }
}

/// Task identifiers, spelled the way exports name them.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskId {
    #[serde(rename = "gng")]
    GoNoGo,
    #[serde(rename = "flanker")]
    Flanker,
    #[serde(rename = "stroop")]
    Stroop,
    #[serde(rename = "nback")]
    NBack,
    #[serde(rename = "posner")]
    Posner,
    #[serde(rename = "mat")]
    MentalArithmetic,
    #[serde(rename = "pvt")]
    Pvt,
    #[serde(rename = "trailMaking")]
    TrailMaking,
}

impl TaskId {
    pub const ALL: [TaskId; 8] = [
        TaskId::GoNoGo,
        TaskId::Flanker,
        TaskId::Stroop,
        TaskId::NBack,
        TaskId::Posner,
        TaskId::MentalArithmetic,
        TaskId::Pvt,
        TaskId::TrailMaking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::GoNoGo => "gng",
            TaskId::Flanker => "flanker",
            TaskId::Stroop => "stroop",
            TaskId::NBack => "nback",
            TaskId::Posner => "posner",
            TaskId::MentalArithmetic => "mat",
            TaskId::Pvt => "pvt",
            TaskId::TrailMaking => "trailMaking",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskId::GoNoGo => "Go/No-Go Test",
            TaskId::Flanker => "Flanker Task",
            TaskId::Stroop => "Stroop Test",
            TaskId::NBack => "N-Back Task",
            TaskId::Posner => "Posner Cueing Task",
            TaskId::MentalArithmetic => "Mental Arithmetic Task",
            TaskId::Pvt => "Psychomotor Vigilance Task",
            TaskId::TrailMaking => "Trail Making Test",
        }
    }

    /// Parses an export identifier such as `"nback"`.
    pub fn parse(id: &str) -> Option<TaskId> {
        TaskId::ALL.into_iter().find(|task| task.as_str() == id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_round_trip_through_their_export_names() {
        for task in TaskId::ALL {
            assert_eq!(TaskId::parse(task.as_str()), Some(task));
            let json = serde_json::to_string(&task).unwrap();
            assert_eq!(json, format!("\"{}\"", task.as_str()));
        }
        assert_eq!(TaskId::parse("registration"), None);
    }

    #[test]
    fn block_kind_helpers() {
        assert!(BlockKind::Practice.is_practice());
        assert!(BlockKind::Main.is_main());
        assert!(!BlockKind::Main.is_practice());
    }
}
