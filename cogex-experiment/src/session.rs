//! Block and session control for one task.
//!
//! A [`Session`] owns the scheduler, the trial runner and everything recorded
//! so far. It is driven from outside by two calls: [`Session::advance_to`] to
//! let time pass and [`Session::respond`] to deliver input. Both return the
//! events produced, in order, for the presentation layer to act on.

use std::collections::VecDeque;
use std::fmt;

use cogex_core::{
    BlockKind, ContractError, GenerationError, Response, TaskId, TrialRecord, TrialSpec,
    TrialState,
};
use cogex_timing::{Clock, Scheduler};
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error, info, trace};

use crate::aggregate::{BlockResult, Tally, TaskSummary};
use crate::error::SessionError;
use crate::runner::{ResponseEvent, RunnerEvent, TrialContext, TrialRunner, TrialTimer};
use crate::task::Task;

const REST_TICK_MS: u64 = 1_000;

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum SessionTimer {
    Trial(TrialTimer),
    /// One second of a rest countdown before `block`.
    RestTick { block: usize },
    /// Silent pause before `block`.
    BlockGap { block: usize },
}

impl From<TrialTimer> for SessionTimer {
    fn from(timer: TrialTimer) -> Self {
        SessionTimer::Trial(timer)
    }
}

/// Block numbers are 1-based.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Pending,
    Running { block: usize },
    Resting { next: usize, remaining_s: u32 },
    Gap { next: usize },
    Finished,
    Halted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent<S> {
    BlockStarted {
        block: usize,
        label: String,
        kind: BlockKind,
        trials: usize,
    },
    PhaseEntered {
        block: usize,
        trial: usize,
        state: TrialState,
        label: String,
    },
    StimulusOnset {
        block: usize,
        trial: usize,
        at_ms: u64,
        spec: TrialSpec<S>,
    },
    ResponseRejected {
        block: usize,
        trial: usize,
        response: Response,
    },
    TrialCompleted(TrialRecord<S>),
    BlockCompleted(BlockResult),
    RestTick {
        next_block: usize,
        remaining_s: u32,
    },
    TaskCompleted {
        task: TaskId,
        trials: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageMetadata {
    pub trials_count: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub formatted_at: OffsetDateTime,
}

/// Everything a finished task hands to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPackage<S> {
    pub task_id: TaskId,
    pub participant_id: String,
    pub results: TaskSummary,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub trial_data: Vec<TrialRecord<S>>,
    pub metadata: PackageMetadata,
}

type CompletionHook<S> = Box<dyn FnOnce(TaskPackage<S>)>;

pub struct Session<T: Task, C: Clock, R: Rng> {
    task: T,
    participant: String,
    scheduler: Scheduler<C, SessionTimer>,
    rng: R,
    runner: TrialRunner<T::Stimulus>,
    stage: Stage,
    queue: VecDeque<TrialSpec<T::Stimulus>>,
    current: Option<TrialSpec<T::Stimulus>>,
    trial_index: usize,
    records: Vec<TrialRecord<T::Stimulus>>,
    block_start: usize,
    running: Tally,
    block_results: Vec<BlockResult>,
    started_ms: u64,
    finished_ms: u64,
    completed: bool,
    on_complete: Option<CompletionHook<T::Stimulus>>,
}

impl<T: Task, C: Clock, R: Rng> fmt::Debug for Session<T, C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("task", &self.task.id())
            .field("participant", &self.participant)
            .field("stage", &self.stage)
            .field("records", &self.records.len())
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

impl<T: Task, C: Clock, R: Rng> Session<T, C, R> {
    pub fn new(task: T, clock: C, rng: R, participant: impl Into<String>) -> Self {
        let runner = TrialRunner::new(task.config().timing.clone());
        Self {
            task,
            participant: participant.into(),
            scheduler: Scheduler::new(clock),
            rng,
            runner,
            stage: Stage::Pending,
            queue: VecDeque::new(),
            current: None,
            trial_index: 0,
            records: Vec::new(),
            block_start: 0,
            running: Tally::default(),
            block_results: Vec::new(),
            started_ms: 0,
            finished_ms: 0,
            completed: false,
            on_complete: None,
        }
    }

    /// Registers the single-fire completion hook. When set, the package is
    /// delivered as soon as the last block ends.
    pub fn with_completion(mut self, hook: impl FnOnce(TaskPackage<T::Stimulus>) + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn now(&self) -> u64 {
        self.scheduler.now()
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    pub fn runner(&self) -> &TrialRunner<T::Stimulus> {
        &self.runner
    }

    pub fn records(&self) -> &[TrialRecord<T::Stimulus>] {
        &self.records
    }

    /// Counters of the block in progress.
    pub fn running_tally(&self) -> &Tally {
        &self.running
    }

    pub fn block_results(&self) -> &[BlockResult] {
        &self.block_results
    }

    pub fn start(&mut self) -> Result<Vec<SessionEvent<T::Stimulus>>, SessionError> {
        match self.stage {
            Stage::Pending => {}
            Stage::Halted => return Err(ContractError::Halted.into()),
            _ => return Err(ContractError::AlreadyStarted.into()),
        }
        self.started_ms = self.scheduler.now();
        info!(
            task = %self.task.id(),
            participant = %self.participant,
            blocks = self.task.config().blocks.len(),
            trials = self.task.config().total_trials(),
            "task started"
        );
        if self.task.config().blocks.is_empty() {
            return Err(self.halt(GenerationError::NoBlocks));
        }
        let mut events = Vec::new();
        self.begin_block(0, &mut events)?;
        Ok(events)
    }

    /// Lets time pass up to `at_ms`, firing every timer due on the way.
    pub fn advance_to(&mut self, at_ms: u64) -> Result<Vec<SessionEvent<T::Stimulus>>, SessionError> {
        self.ensure_live()?;
        let mut events = Vec::new();
        while let Some(timer) = self.scheduler.pop_due(at_ms) {
            match timer {
                SessionTimer::Trial(timer) => {
                    let batch = self.runner.on_timer(&mut self.scheduler, timer);
                    self.drive(batch, &mut events)?;
                }
                SessionTimer::RestTick { block } => self.on_rest_tick(block, &mut events)?,
                SessionTimer::BlockGap { block } => {
                    if self.stage == (Stage::Gap { next: block }) {
                        self.begin_block(block - 1, &mut events)?;
                    } else {
                        trace!(block, stage = ?self.stage, "stale block gap dropped");
                    }
                }
            }
        }
        self.scheduler.advance_to(at_ms);
        Ok(events)
    }

    pub fn advance_by(&mut self, delta_ms: u64) -> Result<Vec<SessionEvent<T::Stimulus>>, SessionError> {
        let target = self.scheduler.now().saturating_add(delta_ms);
        self.advance_to(target)
    }

    /// Delivers a response stamped `at_ms`. Timers due at or before the stamp
    /// fire first, so a response landing exactly on a deadline loses.
    pub fn respond(
        &mut self,
        response: Response,
        at_ms: u64,
    ) -> Result<Vec<SessionEvent<T::Stimulus>>, SessionError> {
        let mut events = self.advance_to(at_ms)?;
        match self.stage {
            Stage::Running { .. } => {
                let batch = self
                    .runner
                    .on_response(&mut self.scheduler, ResponseEvent::new(response, at_ms));
                self.drive(batch, &mut events)?;
            }
            stage => trace!(?stage, %response, "response outside a running block"),
        }
        Ok(events)
    }

    pub fn respond_now(&mut self, response: Response) -> Result<Vec<SessionEvent<T::Stimulus>>, SessionError> {
        let now = self.scheduler.now();
        self.respond(response, now)
    }

    /// Builds the task package. Fires at most once; the hook, if any, gets a copy.
    pub fn complete(&mut self) -> Result<TaskPackage<T::Stimulus>, SessionError> {
        if self.completed {
            return Err(ContractError::AlreadyCompleted.into());
        }
        match self.stage {
            Stage::Finished => {}
            Stage::Pending => return Err(ContractError::NotStarted.into()),
            Stage::Halted => return Err(ContractError::Halted.into()),
            _ => {
                let remaining = self.task.config().blocks.len() - self.block_results.len();
                return Err(ContractError::BlocksRemaining { remaining }.into());
            }
        }
        self.completed = true;

        let package = TaskPackage {
            task_id: self.task.id(),
            participant_id: self.participant.clone(),
            results: TaskSummary::new(self.block_results.clone(), &self.records),
            started_at: self.scheduler.wall_time(self.started_ms),
            completed_at: self.scheduler.wall_time(self.finished_ms),
            duration_ms: self.finished_ms - self.started_ms,
            trial_data: self.records.clone(),
            metadata: PackageMetadata {
                trials_count: self.records.len(),
                formatted_at: self.scheduler.wall_time(self.scheduler.now()),
            },
        };
        info!(
            task = %package.task_id,
            trials = package.metadata.trials_count,
            accuracy = package.results.overall.accuracy,
            duration_ms = package.duration_ms,
            "task package ready"
        );
        if let Some(hook) = self.on_complete.take() {
            hook(package.clone());
        }
        Ok(package)
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        match self.stage {
            Stage::Pending => Err(ContractError::NotStarted.into()),
            Stage::Halted => Err(ContractError::Halted.into()),
            _ => Ok(()),
        }
    }

    fn halt(&mut self, err: GenerationError) -> SessionError {
        error!(task = %self.task.id(), error = %err, "task halted");
        self.stage = Stage::Halted;
        self.queue.clear();
        SessionError::Generation(err)
    }

    fn begin_block(
        &mut self,
        index: usize,
        events: &mut Vec<SessionEvent<T::Stimulus>>,
    ) -> Result<(), SessionError> {
        let Some(plan) = self.task.config().blocks.get(index) else {
            return Err(self.halt(GenerationError::NoBlocks));
        };
        let (label, kind, expected) = (plan.label.clone(), plan.kind, plan.trials);
        let generated = match expected {
            0 => Err(GenerationError::EmptyBlock { label: label.clone() }),
            _ => self.task.generate(plan, &mut self.rng),
        };
        let specs = match generated {
            Ok(specs) if specs.len() != expected => {
                return Err(self.halt(GenerationError::TrialCountMismatch {
                    label,
                    expected,
                    actual: specs.len(),
                }));
            }
            Ok(specs) => specs,
            Err(err) => return Err(self.halt(err)),
        };

        let block = index + 1;
        info!(task = %self.task.id(), block, %label, ?kind, trials = specs.len(), "block started");
        events.push(SessionEvent::BlockStarted {
            block,
            label,
            kind,
            trials: specs.len(),
        });
        self.stage = Stage::Running { block };
        self.queue = specs.into();
        self.trial_index = 0;
        self.block_start = self.records.len();
        self.running = Tally::default();
        self.next_trial(events)
    }

    fn next_trial(&mut self, events: &mut Vec<SessionEvent<T::Stimulus>>) -> Result<(), SessionError> {
        let Some(spec) = self.queue.pop_front() else {
            return self.end_block(events);
        };
        let batch = self.arm(spec)?;
        self.drive(batch, events)
    }

    fn arm(&mut self, spec: TrialSpec<T::Stimulus>) -> Result<Vec<RunnerEvent<T::Stimulus>>, SessionError> {
        let Stage::Running { block } = self.stage else {
            return Err(ContractError::NoActiveTrial.into());
        };
        let kind = self.task.config().blocks[block - 1].kind;
        self.trial_index += 1;
        let ctx = TrialContext {
            index: self.trial_index,
            block,
            kind,
        };
        self.current = Some(spec.clone());
        let batch = self
            .runner
            .arm(&mut self.scheduler, &mut self.rng, ctx, spec)?;
        Ok(batch)
    }

    /// Translates runner output and keeps arming trials while the runner
    /// reports itself ready within the same instant.
    fn drive(
        &mut self,
        batch: Vec<RunnerEvent<T::Stimulus>>,
        events: &mut Vec<SessionEvent<T::Stimulus>>,
    ) -> Result<(), SessionError> {
        let mut batch = batch;
        loop {
            if !self.absorb(batch, events) {
                return Ok(());
            }
            match self.queue.pop_front() {
                Some(spec) => batch = self.arm(spec)?,
                None => return self.end_block(events),
            }
        }
    }

    /// Returns true once the runner is idle and wants the next trial.
    fn absorb(
        &mut self,
        batch: Vec<RunnerEvent<T::Stimulus>>,
        events: &mut Vec<SessionEvent<T::Stimulus>>,
    ) -> bool {
        let block = match self.stage {
            Stage::Running { block } => block,
            _ => 0,
        };
        let mut ready = false;
        for event in batch {
            match event {
                RunnerEvent::Entered { trial, state, label } => {
                    events.push(SessionEvent::PhaseEntered {
                        block,
                        trial,
                        state,
                        label,
                    });
                }
                RunnerEvent::StimulusOnset { trial, at_ms } => {
                    if let Some(spec) = self.current.clone() {
                        events.push(SessionEvent::StimulusOnset {
                            block,
                            trial,
                            at_ms,
                            spec,
                        });
                    }
                }
                RunnerEvent::Rejected { trial, response } => {
                    events.push(SessionEvent::ResponseRejected {
                        block,
                        trial,
                        response,
                    });
                }
                RunnerEvent::Resolved(record) => {
                    self.running = self.running.accumulate(&record);
                    self.records.push(record.clone());
                    events.push(SessionEvent::TrialCompleted(record));
                }
                RunnerEvent::Ready { .. } => {
                    self.current = None;
                    ready = true;
                }
            }
        }
        ready
    }

    fn end_block(&mut self, events: &mut Vec<SessionEvent<T::Stimulus>>) -> Result<(), SessionError> {
        let Stage::Running { block } = self.stage else {
            return Err(ContractError::NoActiveTrial.into());
        };
        self.runner.complete_block()?;

        let config = self.task.config();
        let plan = &config.blocks[block - 1];
        let result = BlockResult::from_records(block, plan.label.clone(), plan.kind, &self.records[self.block_start..]);
        debug_assert_eq!(result.tally(), &self.running);
        info!(
            task = %self.task.id(),
            block,
            trials = result.summary.tally.trials,
            accuracy = result.summary.accuracy,
            mean_rt_ms = ?result.summary.mean_reaction_time,
            "block completed"
        );
        let plan_kind = plan.kind;
        let rest_s = config.rest_s;
        let gap_ms = config.block_gap_ms;
        let next_kind = config.blocks.get(block).map(|next| next.kind);
        self.block_results.push(result.clone());
        events.push(SessionEvent::BlockCompleted(result));

        let next = block + 1;
        match next_kind {
            None => self.finish(events),
            Some(next_kind) if rest_s > 0 && plan_kind.is_main() && next_kind.is_main() => {
                debug!(next_block = next, rest_s, "rest started");
                self.stage = Stage::Resting {
                    next,
                    remaining_s: rest_s,
                };
                events.push(SessionEvent::RestTick {
                    next_block: next,
                    remaining_s: rest_s,
                });
                self.scheduler
                    .schedule(REST_TICK_MS, SessionTimer::RestTick { block: next });
                Ok(())
            }
            Some(_) if gap_ms > 0 => {
                self.stage = Stage::Gap { next };
                self.scheduler
                    .schedule(gap_ms, SessionTimer::BlockGap { block: next });
                Ok(())
            }
            Some(_) => self.begin_block(block, events),
        }
    }

    fn on_rest_tick(
        &mut self,
        block: usize,
        events: &mut Vec<SessionEvent<T::Stimulus>>,
    ) -> Result<(), SessionError> {
        let Stage::Resting { next, remaining_s } = self.stage else {
            trace!(block, stage = ?self.stage, "stale rest tick dropped");
            return Ok(());
        };
        if next != block {
            trace!(block, next, "rest tick for another block dropped");
            return Ok(());
        }
        let remaining_s = remaining_s.saturating_sub(1);
        events.push(SessionEvent::RestTick {
            next_block: next,
            remaining_s,
        });
        if remaining_s == 0 {
            debug!(next_block = next, "rest over");
            return self.begin_block(next - 1, events);
        }
        self.stage = Stage::Resting { next, remaining_s };
        self.scheduler
            .schedule(REST_TICK_MS, SessionTimer::RestTick { block: next });
        Ok(())
    }

    fn finish(&mut self, events: &mut Vec<SessionEvent<T::Stimulus>>) -> Result<(), SessionError> {
        self.stage = Stage::Finished;
        self.finished_ms = self.scheduler.now();
        events.push(SessionEvent::TaskCompleted {
            task: self.task.id(),
            trials: self.records.len(),
        });
        if self.on_complete.is_some() {
            self.complete()?;
        }
        Ok(())
    }
}
