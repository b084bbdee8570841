//! Life visualization — progress arithmetic, the week grid, and the countdown.

pub mod countdown;
pub mod grid;
pub mod progress;

pub use countdown::LifeCountdown;
pub use grid::{WeekCell, WeekGrid, WeekState};
pub use progress::LifeProgress;
