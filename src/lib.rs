//! LifeTracker — life-in-weeks progress, tasks, and goals.

pub mod config;
pub mod dates;
pub mod error;
pub mod goals;
pub mod life;
pub mod local;
pub mod profile;
pub mod store;
pub mod sync;
pub mod todos;
