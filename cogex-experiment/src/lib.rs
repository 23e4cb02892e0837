pub mod aggregate;
pub mod config;
pub mod error;
pub mod runner;
pub mod scoring;
pub mod sequence;
pub mod session;
pub mod task;

pub use aggregate::{BlockResult, Summary, Tally, TaskSummary};
pub use config::{BlockPlan, Delay, ErrorPolicy, PhaseStep, PrematurePolicy, TaskConfig, TrialTiming};
pub use error::SessionError;
pub use runner::{ResponseEvent, RunnerEvent, TimerKind, TrialContext, TrialRunner, TrialTimer};
pub use scoring::Scoring;
pub use sequence::ConditionTable;
pub use session::{PackageMetadata, Session, SessionEvent, SessionTimer, Stage, TaskPackage};
pub use task::Task;
