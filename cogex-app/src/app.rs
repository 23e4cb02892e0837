use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cogex_core::TaskId;
use cogex_experiment::{Session, SessionEvent, Task, TaskPackage};
use cogex_timing::{Clock, ManualClock, SystemClock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::env_config::Settings;
use crate::participant::SimulatedParticipant;

/// Upper bound on driver iterations per task, far above any configured battery.
const MAX_STEPS: usize = 1_000_000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionMetadata {
    #[serde(with = "time::serde::rfc3339")]
    started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    completed_at: OffsetDateTime,
    seed: u64,
    realtime: bool,
    task_order: Vec<TaskId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportSummary {
    total_tasks_completed: usize,
    tasks_included: Vec<TaskId>,
}

/// The whole session as written to disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionExport {
    session_id: String,
    participant: String,
    session_metadata: SessionMetadata,
    task_results: Map<String, Value>,
    summary: ExportSummary,
}

pub struct App {
    settings: Settings,
    rng: StdRng,
}

impl App {
    pub fn new(settings: Settings) -> Self {
        let rng = StdRng::seed_from_u64(settings.seed);
        Self { settings, rng }
    }

    /// Runs every configured task in order and writes the export. Returns its path.
    pub fn run(mut self) -> Result<PathBuf> {
        let started_at = OffsetDateTime::now_utc();
        info!(
            participant = %self.settings.participant,
            seed = self.settings.seed,
            realtime = self.settings.realtime,
            tasks = self.settings.tasks.len(),
            "session started"
        );

        let mut task_results = Map::new();
        let mut included = Vec::new();
        for id in self.settings.tasks.clone() {
            let package = self
                .run_by_id(id)
                .with_context(|| format!("running {}", id.name()))?;
            task_results.insert(id.as_str().to_string(), package);
            included.push(id);
        }

        let completed_at = OffsetDateTime::now_utc();
        let export = SessionExport {
            session_id: format!("session_{}", started_at.unix_timestamp()),
            participant: self.settings.participant.clone(),
            session_metadata: SessionMetadata {
                started_at,
                completed_at,
                seed: self.settings.seed,
                realtime: self.settings.realtime,
                task_order: self.settings.tasks.clone(),
            },
            task_results,
            summary: ExportSummary {
                total_tasks_completed: included.len(),
                tasks_included: included,
            },
        };
        self.write(&export)
    }

    fn run_by_id(&mut self, id: TaskId) -> Result<Value> {
        let battery = self.settings.battery.clone();
        match id {
            TaskId::GoNoGo => self.run_task(battery.gng),
            TaskId::Flanker => self.run_task(battery.flanker),
            TaskId::Stroop => self.run_task(battery.stroop),
            TaskId::NBack => self.run_task(battery.nback),
            TaskId::Posner => self.run_task(battery.posner),
            TaskId::MentalArithmetic => self.run_task(battery.mat),
            TaskId::Pvt => self.run_task(battery.pvt),
            TaskId::TrailMaking => self.run_task(battery.trail_making),
        }
    }

    fn run_task<T: Task>(&mut self, task: T) -> Result<Value> {
        let session_rng = StdRng::seed_from_u64(self.rng.random());
        let participant = SimulatedParticipant::new(StdRng::seed_from_u64(self.rng.random()));
        let who = self.settings.participant.clone();
        let package = if self.settings.realtime {
            drive(Session::new(task, SystemClock::new(), session_rng, who), participant)?
        } else {
            let clock = ManualClock::new(OffsetDateTime::now_utc());
            drive(Session::new(task, clock, session_rng, who), participant)?
        };
        info!(
            task = %package.task_id,
            accuracy = package.results.overall.accuracy,
            mean_rt = ?package.results.overall.mean_reaction_time,
            duration_ms = package.duration_ms,
            "task finished"
        );
        serde_json::to_value(&package).context("serializing task package")
    }

    fn write(&self, export: &SessionExport) -> Result<PathBuf> {
        let dir = &self.settings.out_dir;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        let path = dir.join(format!(
            "cogex_{}_{}.json",
            sanitize(&self.settings.participant),
            export.session_metadata.started_at.unix_timestamp()
        ));
        let json = serde_json::to_string_pretty(export).context("serializing session export")?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "results saved");
        Ok(path)
    }
}

/// Feeds a session with the participant's responses until the task completes.
pub fn drive<T, C, R, P>(
    mut session: Session<T, C, R>,
    mut participant: SimulatedParticipant<P>,
) -> Result<TaskPackage<T::Stimulus>>
where
    T: Task,
    C: Clock,
    R: Rng,
    P: Rng,
{
    let mut events = session.start()?;
    for _ in 0..MAX_STEPS {
        for event in events.drain(..) {
            match event {
                SessionEvent::BlockStarted { label, trials, kind, .. } => {
                    info!(block = %label, ?kind, trials, "block started");
                }
                SessionEvent::StimulusOnset { spec, at_ms, .. } => {
                    participant.on_stimulus(&spec, at_ms);
                }
                SessionEvent::ResponseRejected { trial, response, .. } => {
                    debug!(trial, ?response, "response rejected");
                    participant.on_rejected(session.now());
                }
                SessionEvent::TrialCompleted(_) => participant.on_trial_end(),
                SessionEvent::BlockCompleted(result) => {
                    info!(
                        block = %result.label,
                        accuracy = result.summary.accuracy,
                        mean_rt = ?result.summary.mean_reaction_time,
                        "block completed"
                    );
                }
                SessionEvent::RestTick { next_block, remaining_s } => {
                    debug!(next_block, remaining_s, "resting");
                }
                _ => {}
            }
        }
        if session.is_finished() {
            return Ok(session.complete()?);
        }
        events = match (participant.next_at(), session.next_deadline()) {
            (Some(at), Some(due)) if at > due => session.advance_to(due)?,
            (Some(_), _) => match participant.take() {
                Some((response, at)) => session.respond(response, at)?,
                None => Vec::new(),
            },
            (None, Some(due)) => session.advance_to(due)?,
            (None, None) => {
                warn!(stage = ?session.stage(), "session has nothing scheduled");
                bail!("{} stalled before finishing", session.task().id().name());
            }
        };
    }
    bail!("{} did not finish", session.task().id().name())
}

fn sanitize(participant: &str) -> String {
    participant
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
