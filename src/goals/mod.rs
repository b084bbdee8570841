//! Goals — model, step lists, horizons, and analytics.

pub mod analytics;
pub mod model;
pub mod steps;
pub mod timeframe;

pub use analytics::GoalAnalytics;
pub use model::{Goal, GoalPatch, GoalStep};
pub use steps::StepProgress;
pub use timeframe::{TargetPreset, TimeframeBucket, is_long_term, split_short_long};
