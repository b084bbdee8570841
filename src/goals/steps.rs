//! Goal-step list operations.
//!
//! Step lists are kept sorted by `order`, and `order` runs `0..len` with no
//! gaps after every mutation here.

use serde::Serialize;

use crate::error::ValidationError;
use crate::goals::model::GoalStep;

/// Reject a step list with a blank title, naming the 1-based position.
pub fn validate_steps(steps: &[GoalStep]) -> Result<(), ValidationError> {
    match steps.iter().position(|s| s.title.trim().is_empty()) {
        Some(index) => Err(ValidationError::EmptyStepTitle { position: index + 1 }),
        None => Ok(()),
    }
}

/// Sort by current order (stable) and renumber `0..len`.
pub fn renormalize(steps: &mut [GoalStep]) {
    steps.sort_by_key(|s| s.order);
    for (i, step) in steps.iter_mut().enumerate() {
        step.order = i as u32;
    }
}

/// Remove a step by id and close the gap it leaves.
pub fn remove_step(steps: &mut Vec<GoalStep>, step_id: &str) -> Option<GoalStep> {
    let index = steps.iter().position(|s| s.id == step_id)?;
    let removed = steps.remove(index);
    renormalize(steps);
    Some(removed)
}

/// Move the step at position `from` to position `to`.
pub fn move_step(steps: &mut Vec<GoalStep>, from: usize, to: usize) -> bool {
    if from >= steps.len() || to >= steps.len() {
        return false;
    }
    renormalize(steps);
    let step = steps.remove(from);
    steps.insert(to, step);
    for (i, step) in steps.iter_mut().enumerate() {
        step.order = i as u32;
    }
    true
}

/// Flip a step's completion, returning the updated step.
pub fn toggle_step<'a>(steps: &'a mut [GoalStep], step_id: &str) -> Option<&'a GoalStep> {
    let step = steps.iter_mut().find(|s| s.id == step_id)?;
    step.completed = !step.completed;
    Some(step)
}

/// Completed-step progress for one goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StepProgress {
    pub completed: u32,
    pub total: u32,
}

impl StepProgress {
    pub fn of(steps: &[GoalStep]) -> Self {
        Self {
            completed: steps.iter().filter(|s| s.completed).count() as u32,
            total: steps.len() as u32,
        }
    }

    /// `completed / total`, 0 with no steps.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }

    /// Whole percent, rounded.
    pub fn percent(&self) -> u32 {
        (self.fraction() * 100.0).round() as u32
    }
}
