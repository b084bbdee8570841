//! Tasks: the model, view filtering and statistics.

pub mod filter;
pub mod model;
pub mod stats;

pub use filter::{PriorityFilter, Timeframe, TodoFilter, sort_tasks, visible_tasks};
pub use model::{Priority, Task, TaskPatch};
pub use stats::{PriorityDistribution, TaskStats, current_streak, recently_completed};
