//! Domain model (IDs, tasks, states, outcomes).

pub mod ids;
pub mod outcome;
pub mod state;
pub mod task;

pub use ids::{IdParseError, RunId, TaskId};
pub use outcome::{Resolution, RunReport, TaskOutcome};
pub use state::TaskState;
pub use task::{Task, TaskError, Work};
