//! The task battery: one thin [`Task`](cogex_experiment::Task) per paradigm.

pub mod battery;
pub mod flanker;
pub mod go_no_go;
pub mod mental_arithmetic;
pub mod n_back;
pub mod posner;
pub mod pvt;
pub mod stroop;
pub mod trail_making;

pub use battery::{Battery, DEFAULT_ORDER};
pub use flanker::Flanker;
pub use go_no_go::GoNoGo;
pub use mental_arithmetic::MentalArithmetic;
pub use n_back::NBack;
pub use posner::Posner;
pub use pvt::Pvt;
pub use stroop::Stroop;
pub use trail_making::TrailMaking;
