use std::collections::BTreeMap;

use cogex_core::{BlockKind, Condition, Outcome, TrialRecord};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Outcome counters, folded one record at a time.
#[derive(Copy, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub trials: u32,
    pub hits: u32,
    pub misses: u32,
    pub false_alarms: u32,
    pub correct_rejections: u32,
    pub correct: u32,
    pub incorrect: u32,
    pub timeouts: u32,
    pub premature: u32,
    /// Presses ignored before stimulus onset (PVT false starts).
    pub early_presses: u32,
    /// Wrong responses rejected while the window stayed open (Trail Making wrong moves).
    pub errors: u32,
    #[serde(skip)]
    rt_sum_ms: u64,
    #[serde(skip)]
    rt_count: u32,
}

impl Tally {
    pub fn accumulate<S>(mut self, record: &TrialRecord<S>) -> Self {
        self.trials += 1;
        match record.outcome {
            Outcome::Hit => self.hits += 1,
            Outcome::Miss => self.misses += 1,
            Outcome::FalseAlarm => self.false_alarms += 1,
            Outcome::CorrectRejection => self.correct_rejections += 1,
            Outcome::Correct => self.correct += 1,
            Outcome::Incorrect => self.incorrect += 1,
            Outcome::TimedOut => self.timeouts += 1,
            Outcome::Premature => self.premature += 1,
        }
        self.early_presses += record.early_presses;
        self.errors += record.errors;
        // Only correct responses contribute to reaction time.
        if let (true, Some(rt)) = (record.is_correct, record.reaction_time_ms) {
            self.rt_sum_ms += rt;
            self.rt_count += 1;
        }
        self
    }

    pub fn from_records<'a, S: 'a>(records: impl IntoIterator<Item = &'a TrialRecord<S>>) -> Self {
        records
            .into_iter()
            .fold(Tally::default(), |tally, record| tally.accumulate(record))
    }

    pub fn merge(mut self, other: &Tally) -> Self {
        self.trials += other.trials;
        self.hits += other.hits;
        self.misses += other.misses;
        self.false_alarms += other.false_alarms;
        self.correct_rejections += other.correct_rejections;
        self.correct += other.correct;
        self.incorrect += other.incorrect;
        self.timeouts += other.timeouts;
        self.premature += other.premature;
        self.early_presses += other.early_presses;
        self.errors += other.errors;
        self.rt_sum_ms += other.rt_sum_ms;
        self.rt_count += other.rt_count;
        self
    }

    /// Every response the participant made: one accepted per trial plus the rejected ones.
    pub fn total_moves(&self) -> u32 {
        self.trials + self.errors
    }

    pub fn total_correct(&self) -> u32 {
        self.hits + self.correct_rejections + self.correct
    }

    /// Percentage of trials scored correct, 0 for an empty tally.
    pub fn accuracy(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        f64::from(self.total_correct()) / f64::from(self.trials) * 100.0
    }

    pub fn mean_rt_ms(&self) -> Option<f64> {
        (self.rt_count > 0).then(|| self.rt_sum_ms as f64 / f64::from(self.rt_count))
    }

    pub fn summary(&self) -> Summary {
        Summary::from(*self)
    }
}

/// A tally plus its derived rates, as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(flatten)]
    pub tally: Tally,
    pub accuracy: f64,
    pub mean_reaction_time: Option<f64>,
}

impl From<Tally> for Summary {
    fn from(tally: Tally) -> Self {
        Self {
            accuracy: tally.accuracy(),
            mean_reaction_time: tally.mean_rt_ms(),
            tally,
        }
    }
}

fn by_condition<'a, S: 'a>(
    records: impl IntoIterator<Item = &'a TrialRecord<S>>,
) -> BTreeMap<Condition, Summary> {
    let mut tallies: BTreeMap<Condition, Tally> = BTreeMap::new();
    for record in records {
        let tally = tallies.entry(record.condition.clone()).or_default();
        *tally = tally.accumulate(record);
    }
    tallies
        .into_iter()
        .map(|(condition, tally)| (condition, tally.summary()))
        .collect()
}

/// Derived once per block from that block's records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockResult {
    pub block: usize,
    pub label: String,
    pub kind: BlockKind,
    /// Start of the block's first trial.
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    /// End of the block's last trial.
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    #[serde(flatten)]
    pub summary: Summary,
    pub by_condition: BTreeMap<Condition, Summary>,
}

impl BlockResult {
    pub fn from_records<S>(
        block: usize,
        label: impl Into<String>,
        kind: BlockKind,
        records: &[TrialRecord<S>],
    ) -> Self {
        let started_at = records.first().map(|record| record.started_at);
        let completed_at = records.last().map(|record| record.completed_at);
        let duration_ms = match (started_at, completed_at) {
            (Some(start), Some(end)) => u64::try_from((end - start).whole_milliseconds()).unwrap_or(0),
            _ => 0,
        };
        Self {
            block,
            label: label.into(),
            kind,
            started_at,
            completed_at,
            duration_ms,
            summary: Tally::from_records(records).summary(),
            by_condition: by_condition(records),
        }
    }

    pub fn tally(&self) -> &Tally {
        &self.summary.tally
    }
}

/// Task-level results. Practice blocks are reported but excluded from `overall`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub blocks: Vec<BlockResult>,
    pub overall: Summary,
    pub by_condition: BTreeMap<Condition, Summary>,
}

impl TaskSummary {
    pub fn new<S>(blocks: Vec<BlockResult>, records: &[TrialRecord<S>]) -> Self {
        let main = || records.iter().filter(|record| !record.is_practice);
        Self {
            overall: Tally::from_records(main()).summary(),
            by_condition: by_condition(main()),
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::{Observed, Response};
    use time::OffsetDateTime;

    fn record(condition: &str, outcome: Outcome, rt: Option<u64>, practice: bool) -> TrialRecord<()> {
        TrialRecord {
            trial_number: 1,
            block: 1,
            is_practice: practice,
            started_at: OffsetDateTime::UNIX_EPOCH,
            completed_at: OffsetDateTime::UNIX_EPOCH,
            duration_ms: 0,
            condition: Condition::new(condition),
            response: rt.map_or(Observed::Timeout, |_| Observed::Responded(Response::Space)),
            outcome,
            is_correct: outcome.is_correct(),
            reaction_time_ms: rt,
            early_presses: 0,
            errors: 0,
            stimulus: (),
        }
    }

    #[test]
    fn accumulate_is_a_pure_fold() {
        let empty = Tally::default();
        let one = empty.accumulate(&record("go", Outcome::Hit, Some(300), false));
        assert_eq!(empty.trials, 0);
        assert_eq!(one.trials, 1);
        assert_eq!(one.hits, 1);
    }

    #[test]
    fn reaction_time_averages_correct_responses_only() {
        let records = [
            record("go", Outcome::Hit, Some(300), false),
            record("go", Outcome::Hit, Some(500), false),
            record("nogo", Outcome::FalseAlarm, Some(100), false),
            record("nogo", Outcome::CorrectRejection, None, false),
        ];
        let tally = Tally::from_records(&records);
        assert_eq!(tally.mean_rt_ms(), Some(400.0));
        assert_eq!(tally.accuracy(), 75.0);
    }

    #[test]
    fn empty_tally_has_no_mean() {
        let tally = Tally::default();
        assert_eq!(tally.accuracy(), 0.0);
        assert_eq!(tally.mean_rt_ms(), None);
    }

    #[test]
    fn premature_is_its_own_bucket() {
        let tally = Tally::from_records(&[
            record("valid", Outcome::Premature, None, false),
            record("valid", Outcome::Incorrect, Some(400), false),
        ]);
        assert_eq!(tally.premature, 1);
        assert_eq!(tally.incorrect, 1);
        assert_eq!(tally.total_correct(), 0);
    }

    #[test]
    fn merge_matches_single_fold() {
        let records = [
            record("a", Outcome::Correct, Some(410), false),
            record("b", Outcome::TimedOut, None, false),
            record("a", Outcome::Correct, Some(390), false),
        ];
        let whole = Tally::from_records(&records);
        let split = Tally::from_records(&records[..1]).merge(&Tally::from_records(&records[1..]));
        assert_eq!(whole, split);
    }

    #[test]
    fn task_summary_excludes_practice_from_overall() {
        let records = [
            record("go", Outcome::Miss, None, true),
            record("go", Outcome::Hit, Some(350), false),
            record("nogo", Outcome::CorrectRejection, None, false),
        ];
        let practice = BlockResult::from_records(1, "practice", BlockKind::Practice, &records[..1]);
        let main = BlockResult::from_records(2, "main 1", BlockKind::Main, &records[1..]);
        let summary = TaskSummary::new(vec![practice, main], &records);
        assert_eq!(summary.overall.tally.trials, 2);
        assert_eq!(summary.overall.accuracy, 100.0);
        assert_eq!(summary.by_condition[&Condition::new("go")].tally.hits, 1);
        assert_eq!(summary.blocks[0].tally().misses, 1);
    }

    #[test]
    fn block_result_exports_flat_counters() {
        let result = BlockResult::from_records(
            1,
            "main",
            BlockKind::Main,
            &[record("congruent", Outcome::Correct, Some(420), false)],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["correct"], 1);
        assert_eq!(json["accuracy"], 100.0);
        assert_eq!(json["meanReactionTime"], 420.0);
        assert_eq!(json["byCondition"]["congruent"]["trials"], 1);
        assert!(json.get("rtSumMs").is_none());
        assert_eq!(json["errors"], 0);
        assert_eq!(json["earlyPresses"], 0);
        assert_eq!(json["duration"], 0);
    }

    #[test]
    fn early_presses_and_errors_are_summed_and_merged() {
        let mut pvt = record("vigilance", Outcome::Correct, Some(310), false);
        pvt.early_presses = 2;
        let mut trail = record("numbers", Outcome::Correct, Some(900), false);
        trail.errors = 3;
        let records = [pvt, trail, record("numbers", Outcome::Correct, Some(700), false)];

        let whole = Tally::from_records(&records);
        assert_eq!(whole.early_presses, 2);
        assert_eq!(whole.errors, 3);
        assert_eq!(whole.total_moves(), 6);
        let split = Tally::from_records(&records[..2]).merge(&Tally::from_records(&records[2..]));
        assert_eq!(split, whole);
    }

    #[test]
    fn block_result_spans_its_first_and_last_trial() {
        let start = OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(10);
        let mut first = record("numbers", Outcome::Correct, Some(800), false);
        first.started_at = start;
        first.completed_at = start + time::Duration::milliseconds(800);
        first.errors = 1;
        let mut last = record("numbers", Outcome::Correct, Some(600), false);
        last.started_at = start + time::Duration::milliseconds(800);
        last.completed_at = start + time::Duration::milliseconds(1_400);

        let result = BlockResult::from_records(2, "round A", BlockKind::Main, &[first, last]);
        assert_eq!(result.started_at, Some(start));
        assert_eq!(result.completed_at, Some(start + time::Duration::milliseconds(1_400)));
        assert_eq!(result.duration_ms, 1_400);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration"], 1_400);
        assert_eq!(json["errors"], 1);
        assert_eq!(json["startedAt"], "1970-01-01T00:00:10Z");

        let none: &[TrialRecord<()>] = &[];
        let empty = BlockResult::from_records(1, "empty", BlockKind::Main, none);
        assert_eq!((empty.started_at, empty.duration_ms), (None, 0));
    }
}
