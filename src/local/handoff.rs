//! One-shot push of device-local records into a signed-in user's store.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{CacheError, Result};
use crate::local::tasks::LocalTasks;
use crate::local::user::UserRepository;
use crate::store::Database;

/// What a handoff moved and what it had to leave behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffReport {
    pub tasks_pushed: u32,
    pub tasks_kept: u32,
    pub goals_pushed: u32,
    pub goals_kept: u32,
    pub profile_pushed: bool,
}

impl HandoffReport {
    pub fn is_complete(&self) -> bool {
        self.tasks_kept == 0 && self.goals_kept == 0
    }
}

/// Insert every local task and goal for `user_id`.
///
/// Records the store rejects stay in the local cache for the next
/// attempt; the rest are cleared. An unreadable task entry is left
/// untouched. The local profile is pushed only when
/// the user has none stored yet.
pub async fn push_local_records(
    db: &dyn Database,
    user_id: &str,
    tasks: &LocalTasks,
    users: &UserRepository,
) -> Result<HandoffReport> {
    let mut report = HandoffReport::default();

    match tasks.load_strict().await {
        Ok(local_tasks) => {
            let mut kept_tasks = Vec::new();
            for task in local_tasks {
                match db.insert_task(user_id, &task).await {
                    Ok(_) => report.tasks_pushed += 1,
                    Err(e) => {
                        warn!(task_id = %task.id, error = %e, "Keeping local task after failed push");
                        kept_tasks.push(task);
                    }
                }
            }
            report.tasks_kept = kept_tasks.len() as u32;
            if kept_tasks.is_empty() {
                tasks.clear().await?;
            } else {
                tasks.replace(&kept_tasks).await?;
            }
        }
        // The entry stays untouched.
        Err(CacheError::Malformed { key, reason }) => {
            warn!(%key, %reason, "Skipping unreadable local tasks");
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(local) = users.load().await? {
        let mut kept_goals = Vec::new();
        for goal in &local.goals {
            match db.insert_goal(user_id, goal).await {
                Ok(_) => report.goals_pushed += 1,
                Err(e) => {
                    warn!(goal_id = %goal.id, error = %e, "Keeping local goal after failed push");
                    kept_goals.push(goal.clone());
                }
            }
        }
        report.goals_kept = kept_goals.len() as u32;
        users.set_goals(kept_goals).await?;

        if local.profile.is_setup() && db.get_profile(user_id).await?.is_none() {
            db.set_profile(user_id, &local.profile).await?;
            report.profile_pushed = true;
        }
    }

    info!(
        user_id,
        tasks_pushed = report.tasks_pushed,
        tasks_kept = report.tasks_kept,
        goals_pushed = report.goals_pushed,
        goals_kept = report.goals_kept,
        profile_pushed = report.profile_pushed,
        "Local records handed off"
    );
    Ok(report)
}
