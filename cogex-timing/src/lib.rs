pub mod schedule;
pub mod timer;

pub use schedule::{Scheduler, TimerHandle};
pub use timer::{Clock, ManualClock, SystemClock};
