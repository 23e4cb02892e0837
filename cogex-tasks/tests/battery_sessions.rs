use std::collections::VecDeque;

use cogex_core::{Condition, Expected, Outcome, Response, TrialSpec};
use cogex_experiment::{BlockPlan, Session, SessionEvent, Task, TaskConfig, TaskPackage};
use cogex_tasks::n_back::{NON_TARGET, TARGET};
use cogex_tasks::{
    Battery, Flanker, GoNoGo, MentalArithmetic, NBack, Posner, Pvt, Stroop, TrailMaking,
};
use cogex_timing::ManualClock;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Drives a task to completion on virtual time. `plan` sees each onset and
/// returns the responses to deliver for that trial, in time order.
fn run<T, F>(task: T, seed: u64, mut plan: F) -> TaskPackage<T::Stimulus>
where
    T: Task,
    F: FnMut(&TrialSpec<T::Stimulus>, u64) -> Vec<(Response, u64)>,
{
    let mut session = Session::new(task, ManualClock::default(), StdRng::seed_from_u64(seed), "P042");
    let mut events = session.start().unwrap();
    let mut pending: VecDeque<(Response, u64)> = VecDeque::new();
    for _ in 0..100_000 {
        for event in events.drain(..) {
            if let SessionEvent::StimulusOnset { spec, at_ms, .. } = event {
                pending = plan(&spec, at_ms).into();
            }
        }
        if session.is_finished() {
            return session.complete().unwrap();
        }
        let next_response = pending.front().map(|(_, at)| *at);
        events = match (next_response, session.next_deadline()) {
            (Some(at), Some(due)) if at > due => session.advance_to(due),
            (Some(_), _) => {
                let (response, at) = pending.pop_front().unwrap();
                session.respond(response, at)
            }
            (None, Some(due)) => session.advance_to(due),
            (None, None) => panic!("stalled"),
        }
        .unwrap();
    }
    panic!("task did not finish");
}

fn perfect<S>(spec: &TrialSpec<S>, onset: u64) -> Vec<(Response, u64)> {
    match &spec.expected {
        Expected::Respond(response) => vec![(response.clone(), onset + 250)],
        Expected::Withhold => Vec::new(),
    }
}

fn assert_perfect<S>(package: &TaskPackage<S>, trials: usize) {
    assert_eq!(package.trial_data.len(), trials);
    assert_eq!(package.metadata.trials_count, trials);
    assert!(
        package.trial_data.iter().all(|r| r.is_correct),
        "{}: {:?}",
        package.task_id,
        package
            .trial_data
            .iter()
            .find(|r| !r.is_correct)
            .map(|r| r.outcome)
    );
    assert_eq!(package.results.overall.accuracy, 100.0);
}

#[test]
fn every_default_task_runs_to_completion() {
    let battery = Battery::default();
    assert_perfect(&run(battery.gng.clone(), 1, perfect), 70);
    assert_perfect(&run(battery.flanker.clone(), 2, perfect), 130);
    assert_perfect(&run(battery.stroop.clone(), 3, perfect), 41);
    assert_perfect(&run(battery.nback.clone(), 4, perfect), 100);
    assert_perfect(&run(battery.posner.clone(), 5, perfect), 132);
    assert_perfect(&run(battery.mat.clone(), 6, perfect), 50);
    assert_perfect(&run(battery.pvt.clone(), 7, perfect), 25);
    assert_perfect(&run(battery.trail_making.clone(), 8, perfect), 58);
}

#[test]
fn zero_back_scores_withheld_non_targets_as_correct_rejections() {
    let task = NBack {
        config: TaskConfig::new(
            NBack::default().config.timing,
            vec![BlockPlan::main("0-back", 30, 0)],
        ),
        ..NBack::default()
    };
    // Press for targets, and for every other non-target.
    let mut non_targets = 0;
    let package = run(task, 21, |spec, onset| {
        if spec.condition.as_str() == NON_TARGET {
            non_targets += 1;
            if non_targets % 2 == 0 {
                vec![(Response::Space, onset + 200)]
            } else {
                Vec::new()
            }
        } else {
            vec![(Response::Space, onset + 200)]
        }
    });

    let tally = &package.results.overall.tally;
    assert_eq!(tally.trials, 30);
    assert_eq!(tally.hits, 9);
    assert_eq!(tally.false_alarms + tally.correct_rejections, 21);
    assert_eq!(tally.false_alarms, 10);
    assert_eq!(tally.correct_rejections, 11);
    for record in &package.trial_data {
        match (record.condition.as_str(), record.outcome) {
            (TARGET, Outcome::Hit) => {}
            (NON_TARGET, Outcome::FalseAlarm) => assert!(record.reaction_time_ms.is_some()),
            (NON_TARGET, Outcome::CorrectRejection) => assert!(record.reaction_time_ms.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }
    let target = &package.results.by_condition[&Condition::new(TARGET)];
    assert_eq!(target.mean_reaction_time, Some(200.0));
}

#[test]
fn pvt_fast_presses_are_anticipations() {
    let package = run(Pvt::default(), 9, |_, onset| vec![(Response::Space, onset + 60)]);
    assert!(package.trial_data.iter().all(|r| r.outcome == Outcome::Premature));
    assert_eq!(package.results.overall.tally.premature, 20);
    assert_eq!(package.results.overall.mean_reaction_time, None);
}

#[test]
fn go_no_go_lapses_are_misses() {
    let package = run(GoNoGo::default(), 10, |_, _| Vec::new());
    let tally = &package.results.overall.tally;
    assert_eq!(tally.hits + tally.false_alarms, 0);
    assert_eq!(tally.misses + tally.correct_rejections, 60);
}

#[test]
fn mental_arithmetic_reaction_time_starts_after_the_computation_phase() {
    let package = run(MentalArithmetic::default(), 11, perfect);
    for record in &package.trial_data {
        assert_eq!(record.reaction_time_ms, Some(250));
        // problem 1000 + computation 4000 + response
        assert_eq!(record.duration_ms, 5_250);
    }
}

#[test]
fn trail_making_counts_wrong_clicks() {
    let mut targets = 0;
    let package = run(TrailMaking::default(), 12, |spec, onset| {
        targets += 1;
        let Expected::Respond(answer) = &spec.expected else {
            return Vec::new();
        };
        // Every fifth target gets a wrong click first.
        if targets % 5 == 0 {
            vec![(Response::label("wrong"), onset + 100), (answer.clone(), onset + 300)]
        } else {
            vec![(answer.clone(), onset + 300)]
        }
    });
    assert!(package.trial_data.iter().all(|r| r.outcome == Outcome::Correct));
    let errors: u32 = package.trial_data.iter().map(|r| r.errors).sum();
    assert_eq!(errors, 58 / 5);
    let retried = package.trial_data.iter().filter(|r| r.errors == 1);
    assert!(retried.clone().all(|r| r.reaction_time_ms == Some(300)));
    assert_eq!(retried.count(), 11);

    // Wrong moves and completion time are reported per round.
    let blocks = &package.results.blocks;
    assert_eq!(blocks.iter().map(|b| b.tally().errors).sum::<u32>(), 11);
    for block in blocks {
        let records: Vec<_> = package.trial_data.iter().filter(|r| r.block == block.block).collect();
        let errors: u32 = records.iter().map(|r| r.errors).sum();
        assert_eq!(block.tally().errors, errors);
        assert_eq!(block.tally().total_moves(), records.len() as u32 + errors);
        // No fixation and no ITI: the round lasts exactly as long as its trials.
        assert_eq!(block.duration_ms, records.iter().map(|r| r.duration_ms).sum::<u64>());
    }
    let main_errors: u32 = blocks[1..].iter().map(|b| b.tally().errors).sum();
    assert_eq!(package.results.overall.tally.errors, main_errors);
}

#[test]
fn pvt_false_starts_keep_the_trial_running() {
    let mut session = Session::new(Pvt::default(), ManualClock::default(), StdRng::seed_from_u64(13), "P042");
    session.start().unwrap();
    // The wait is at least a second, so this press comes before the counter.
    let events = session.respond(Response::Space, 10).unwrap();
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::TrialCompleted(_))));

    let due = session.next_deadline().unwrap();
    let events = session.advance_to(due).unwrap();
    let onset = events
        .iter()
        .find_map(|e| match e {
            SessionEvent::StimulusOnset { at_ms, .. } => Some(*at_ms),
            _ => None,
        })
        .unwrap();
    let events = session.respond(Response::Space, onset + 300).unwrap();
    let record = events
        .iter()
        .find_map(|e| match e {
            SessionEvent::TrialCompleted(record) => Some(record.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(record.outcome, Outcome::Correct);
    assert_eq!(record.reaction_time_ms, Some(300));
    assert_eq!(record.early_presses, 1);
    assert_eq!(session.running_tally().early_presses, 1);
}

#[test]
fn flanker_and_posner_sessions_are_reproducible() {
    let first = run(Flanker::default(), 99, perfect);
    let second = run(Flanker::default(), 99, perfect);
    assert_eq!(first.trial_data, second.trial_data);

    let posner = run(Posner::default(), 99, perfect);
    assert_eq!(posner.results.blocks.len(), 4);

    let stroop = run(Stroop::default(), 99, perfect);
    assert_eq!(stroop.results.blocks.len(), 4);
    assert_eq!(stroop.duration_ms, stroop.trial_data.iter().map(|r| r.duration_ms).sum::<u64>()
        + 41 * 1000
        + 2 * 10_000);
}
