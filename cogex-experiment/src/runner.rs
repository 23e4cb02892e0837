//! Single-trial state machine.
//!
//! `Idle → Fixation → Phase(0..n) → ResponseWindow → InterTrial → Idle`.
//!
//! The runner never blocks. Each transition that has to wait arms a timer on
//! the [`Scheduler`]; the payload of that timer carries the serial of the trial
//! it was armed for, and a payload whose serial or kind no longer matches the
//! active trial is dropped. Responses and timeouts race through the same
//! `resolved` flag, so exactly one of them is honored per trial.

use cogex_core::{
    BlockKind, ContractError, Observed, Outcome, Response, Stimulus, TrialRecord, TrialSpec,
    TrialState,
};
use cogex_timing::{Clock, Scheduler, TimerHandle};
use rand::Rng;
use tracing::{debug, trace};

use crate::config::{ErrorPolicy, PrematurePolicy, TrialTiming};

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    FixationEnd,
    PhaseEnd(usize),
    WindowClose,
    InterTrialEnd,
}

/// Timer payload, stamped with the trial it belongs to.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct TrialTimer {
    pub serial: u64,
    pub kind: TimerKind,
}

/// Normalized input from the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEvent {
    pub response: Response,
    pub at_ms: u64,
}

impl ResponseEvent {
    pub fn new(response: Response, at_ms: u64) -> Self {
        Self { response, at_ms }
    }
}

/// Where a trial sits in the task.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct TrialContext {
    /// 1-based trial number within the block.
    pub index: usize,
    /// 1-based block number.
    pub block: usize,
    pub kind: BlockKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent<S> {
    /// Fixation or one of the configured steps started.
    Entered {
        trial: usize,
        state: TrialState,
        label: String,
    },
    /// Stimulus is visible and the response window is open.
    StimulusOnset { trial: usize, at_ms: u64 },
    /// Wrong response absorbed under [`ErrorPolicy::Retry`].
    Rejected { trial: usize, response: Response },
    Resolved(TrialRecord<S>),
    /// Inter-trial interval elapsed; the runner is idle again.
    Ready { trial: usize },
}

#[derive(Debug)]
struct ActiveTrial<S> {
    serial: u64,
    ctx: TrialContext,
    spec: TrialSpec<S>,
    state: TrialState,
    started_ms: u64,
    onset_ms: Option<u64>,
    deadline_ms: Option<u64>,
    inter_trial_ms: u64,
    resolved: bool,
    early_presses: u32,
    errors: u32,
    timers: Vec<TimerHandle>,
}

impl<S> ActiveTrial<S> {
    fn arm<C, E>(&mut self, scheduler: &mut Scheduler<C, E>, delay_ms: u64, kind: TimerKind)
    where
        C: Clock,
        E: From<TrialTimer>,
    {
        let timer = TrialTimer {
            serial: self.serial,
            kind,
        };
        let handle = scheduler.schedule(delay_ms, E::from(timer));
        trace!(serial = self.serial, ?kind, delay_ms, "timer armed");
        self.timers.push(handle);
    }

    fn cancel_all<C: Clock, E>(&mut self, scheduler: &mut Scheduler<C, E>) {
        for handle in self.timers.drain(..) {
            if scheduler.cancel(handle) {
                trace!(serial = self.serial, due = handle.due(), "timer canceled");
            }
        }
    }
}

pub struct TrialRunner<S> {
    timing: TrialTiming,
    next_serial: u64,
    active: Option<ActiveTrial<S>>,
    block_complete: bool,
}

impl<S: Stimulus> TrialRunner<S> {
    pub fn new(timing: TrialTiming) -> Self {
        Self {
            timing,
            next_serial: 0,
            active: None,
            block_complete: false,
        }
    }

    pub fn timing(&self) -> &TrialTiming {
        &self.timing
    }

    pub fn state(&self) -> TrialState {
        match &self.active {
            Some(trial) => trial.state,
            None if self.block_complete => TrialState::BlockComplete,
            None => TrialState::Idle,
        }
    }

    /// Serial of the trial currently owned by the runner.
    pub fn active_serial(&self) -> Option<u64> {
        self.active.as_ref().map(|trial| trial.serial)
    }

    pub fn current_spec(&self) -> Option<&TrialSpec<S>> {
        self.active.as_ref().map(|trial| &trial.spec)
    }

    pub fn current_context(&self) -> Option<TrialContext> {
        self.active.as_ref().map(|trial| trial.ctx)
    }

    /// Marks the end of a block. Only valid while idle.
    pub fn complete_block(&mut self) -> Result<(), ContractError> {
        if let Some(trial) = &self.active {
            return Err(ContractError::TrialInProgress {
                serial: trial.serial,
            });
        }
        self.block_complete = true;
        Ok(())
    }

    /// Takes ownership of `spec` and starts its fixation period.
    pub fn arm<C, E, R>(
        &mut self,
        scheduler: &mut Scheduler<C, E>,
        rng: &mut R,
        ctx: TrialContext,
        spec: TrialSpec<S>,
    ) -> Result<Vec<RunnerEvent<S>>, ContractError>
    where
        C: Clock,
        E: From<TrialTimer>,
        R: Rng + ?Sized,
    {
        if let Some(trial) = &self.active {
            return Err(ContractError::TrialInProgress {
                serial: trial.serial,
            });
        }

        let serial = self.next_serial;
        self.next_serial += 1;
        self.block_complete = false;

        let fixation_ms = self.timing.fixation.sample(rng);
        let inter_trial_ms = self.timing.inter_trial.sample(rng);
        let now = scheduler.now();
        trace!(
            serial,
            trial = ctx.index,
            block = ctx.block,
            condition = %spec.condition,
            stimulus = %spec.stimulus.describe(),
            fixation_ms,
            "trial armed"
        );

        self.active = Some(ActiveTrial {
            serial,
            ctx,
            spec,
            state: TrialState::Fixation,
            started_ms: now,
            onset_ms: None,
            deadline_ms: None,
            inter_trial_ms,
            resolved: false,
            early_presses: 0,
            errors: 0,
            timers: Vec::new(),
        });

        let mut events = vec![RunnerEvent::Entered {
            trial: ctx.index,
            state: TrialState::Fixation,
            label: "fixation".to_string(),
        }];
        if fixation_ms == 0 {
            self.enter_phase(scheduler, 0, &mut events);
        } else if let Some(trial) = self.active.as_mut() {
            trial.arm(scheduler, fixation_ms, TimerKind::FixationEnd);
        }
        Ok(events)
    }

    /// Handles a fired timer. Stale or mismatched timers are dropped.
    pub fn on_timer<C, E>(
        &mut self,
        scheduler: &mut Scheduler<C, E>,
        timer: TrialTimer,
    ) -> Vec<RunnerEvent<S>>
    where
        C: Clock,
        E: From<TrialTimer>,
    {
        let mut events = Vec::new();
        let Some(trial) = self.active.as_mut() else {
            trace!(serial = timer.serial, kind = ?timer.kind, "timer fired with no active trial");
            return events;
        };
        if trial.serial != timer.serial {
            trace!(
                serial = timer.serial,
                active = trial.serial,
                kind = ?timer.kind,
                "stale timer dropped"
            );
            return events;
        }
        trial.timers.retain(|handle| scheduler.is_pending(*handle));

        match (timer.kind, trial.state) {
            (TimerKind::FixationEnd, TrialState::Fixation) => {
                self.enter_phase(scheduler, 0, &mut events);
            }
            (TimerKind::PhaseEnd(fired), TrialState::Phase(current)) if fired == current => {
                self.enter_phase(scheduler, current + 1, &mut events);
            }
            (TimerKind::WindowClose, TrialState::ResponseWindow) if !trial.resolved => {
                let now = scheduler.now();
                self.resolve(scheduler, None, false, now, &mut events);
            }
            (TimerKind::InterTrialEnd, TrialState::InterTrial) => {
                let index = trial.ctx.index;
                self.active = None;
                trace!(serial = timer.serial, "inter-trial interval elapsed");
                events.push(RunnerEvent::Ready { trial: index });
            }
            (kind, state) => {
                trace!(serial = timer.serial, ?kind, ?state, "timer does not match state");
            }
        }
        events
    }

    /// Handles a normalized response. At most one response resolves a trial.
    pub fn on_response<C, E>(
        &mut self,
        scheduler: &mut Scheduler<C, E>,
        event: ResponseEvent,
    ) -> Vec<RunnerEvent<S>>
    where
        C: Clock,
        E: From<TrialTimer>,
    {
        let mut events = Vec::new();
        let premature_policy = self.timing.premature;
        let error_policy = self.timing.errors;
        let anticipation_ms = self.timing.anticipation_ms;

        let Some(trial) = self.active.as_mut() else {
            trace!(response = %event.response, "stray response while idle");
            return events;
        };
        if trial.resolved {
            trace!(serial = trial.serial, response = %event.response, "trial already resolved");
            return events;
        }
        let at_ms = event.at_ms;
        if at_ms < trial.started_ms {
            trace!(serial = trial.serial, at_ms, "response stamped before the trial began");
            return events;
        }
        // Classified by its timestamp, which may lag the runner's state.
        let before_onset = match trial.state {
            TrialState::Fixation | TrialState::Phase(_) => true,
            TrialState::ResponseWindow => trial.onset_ms.is_some_and(|onset| at_ms < onset),
            _ => false,
        };
        if before_onset {
            match premature_policy {
                PrematurePolicy::Resolve => {
                    self.resolve(scheduler, Some(event.response), true, at_ms, &mut events);
                }
                PrematurePolicy::Ignore => {
                    trial.early_presses += 1;
                    trace!(serial = trial.serial, presses = trial.early_presses, "early press ignored");
                }
            }
            return events;
        }

        match trial.state {
            TrialState::ResponseWindow => {
                let onset = trial.onset_ms.unwrap_or(trial.started_ms);
                if trial.deadline_ms.is_some_and(|deadline| at_ms >= deadline) {
                    trace!(serial = trial.serial, at_ms, "response at or after window close");
                    return events;
                }
                let anticipated = anticipation_ms.is_some_and(|limit| at_ms - onset < limit);
                let correct = trial.spec.expected.matches(&event.response);
                if !anticipated
                    && !correct
                    && error_policy == ErrorPolicy::Retry
                    && !trial.spec.expected.is_withhold()
                {
                    trial.errors += 1;
                    debug!(serial = trial.serial, errors = trial.errors, response = %event.response, "wrong response, window stays open");
                    events.push(RunnerEvent::Rejected {
                        trial: trial.ctx.index,
                        response: event.response,
                    });
                    return events;
                }
                self.resolve(scheduler, Some(event.response), anticipated, at_ms, &mut events);
            }
            state => {
                trace!(serial = trial.serial, ?state, response = %event.response, "stray response between trials");
            }
        }
        events
    }

    /// Enters step `index`, or opens the response window once the steps run out.
    fn enter_phase<C, E>(
        &mut self,
        scheduler: &mut Scheduler<C, E>,
        index: usize,
        events: &mut Vec<RunnerEvent<S>>,
    ) where
        C: Clock,
        E: From<TrialTimer>,
    {
        let mut index = index;
        loop {
            let Some(step) = self.timing.steps.get(index) else {
                self.open_window(scheduler, events);
                return;
            };
            let Some(trial) = self.active.as_mut() else {
                return;
            };
            trial.state = TrialState::Phase(index);
            events.push(RunnerEvent::Entered {
                trial: trial.ctx.index,
                state: trial.state,
                label: step.label.clone(),
            });
            if step.duration_ms > 0 {
                trial.arm(scheduler, step.duration_ms, TimerKind::PhaseEnd(index));
                return;
            }
            index += 1;
        }
    }

    fn open_window<C, E>(&mut self, scheduler: &mut Scheduler<C, E>, events: &mut Vec<RunnerEvent<S>>)
    where
        C: Clock,
        E: From<TrialTimer>,
    {
        let window_ms = self.timing.response_window_ms;
        let Some(trial) = self.active.as_mut() else {
            return;
        };
        let now = scheduler.now();
        trial.state = TrialState::ResponseWindow;
        trial.onset_ms = Some(now);
        trial.deadline_ms = window_ms.map(|window| now + window);
        trace!(serial = trial.serial, at_ms = now, "stimulus onset");
        events.push(RunnerEvent::StimulusOnset {
            trial: trial.ctx.index,
            at_ms: now,
        });

        match window_ms {
            Some(0) => self.resolve(scheduler, None, false, now, events),
            Some(window) => trial.arm(scheduler, window, TimerKind::WindowClose),
            None => {}
        }
    }

    /// Ends the trial: cancels its timers, emits the record, starts the ITI.
    fn resolve<C, E>(
        &mut self,
        scheduler: &mut Scheduler<C, E>,
        response: Option<Response>,
        premature: bool,
        at_ms: u64,
        events: &mut Vec<RunnerEvent<S>>,
    ) where
        C: Clock,
        E: From<TrialTimer>,
    {
        let scoring = self.timing.scoring;
        let Some(trial) = self.active.as_mut() else {
            return;
        };
        trial.resolved = true;
        trial.cancel_all(scheduler);

        let outcome = if premature {
            Outcome::Premature
        } else {
            scoring.classify(&trial.spec.expected, response.as_ref())
        };
        let reaction_time_ms = match (trial.onset_ms, &response) {
            (Some(onset), Some(_)) if at_ms >= onset => Some(at_ms - onset),
            _ => None,
        };
        let completed_ms = at_ms.max(trial.started_ms);
        let record = TrialRecord {
            trial_number: trial.ctx.index,
            block: trial.ctx.block,
            is_practice: trial.ctx.kind.is_practice(),
            started_at: scheduler.wall_time(trial.started_ms),
            completed_at: scheduler.wall_time(completed_ms),
            duration_ms: completed_ms - trial.started_ms,
            condition: trial.spec.condition.clone(),
            response: response.map_or(Observed::Timeout, Observed::Responded),
            outcome,
            is_correct: outcome.is_correct(),
            reaction_time_ms,
            early_presses: trial.early_presses,
            errors: trial.errors,
            stimulus: trial.spec.stimulus.clone(),
        };
        debug!(
            serial = trial.serial,
            trial = record.trial_number,
            block = record.block,
            condition = %record.condition,
            ?outcome,
            rt_ms = ?reaction_time_ms,
            "trial resolved"
        );
        events.push(RunnerEvent::Resolved(record));

        trial.state = TrialState::InterTrial;
        if trial.inter_trial_ms > 0 {
            let delay = trial.inter_trial_ms;
            trial.arm(scheduler, delay, TimerKind::InterTrialEnd);
        } else {
            let index = trial.ctx.index;
            self.active = None;
            events.push(RunnerEvent::Ready { trial: index });
        }
    }
}
