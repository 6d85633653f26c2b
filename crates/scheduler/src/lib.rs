//! Weekly goal evaluation.
//!
//! - [`Cadence`]: when evaluations fire (cron or fixed interval)
//! - [`EvaluationJob`]: one fire for one goal (checkpoint, verdict, punishment)
//! - [`GoalScheduler`]: registry of per-goal tasks with cancellation

pub mod cadence;
pub mod error;
pub mod job;
pub mod registry;

pub use cadence::Cadence;
pub use error::SchedulerError;
pub use job::{Delivery, EvaluationJob, FireOutcome};
pub use registry::GoalScheduler;
