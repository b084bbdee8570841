//! Profile and goals stored on this device while no one is signed in.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CacheError, ValidationError};
use crate::goals::model::{Goal, GoalPatch};
use crate::local::kv::{KeyValueStore, get_json, set_json};
use crate::profile::UserProfile;

pub const USER_KEY: &str = "lifetracker-user";

/// The locally stored user: profile fields plus the goal list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalUser {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

pub struct UserRepository {
    store: Arc<dyn KeyValueStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored user. An unreadable entry is logged and treated as absent.
    pub async fn load(&self) -> Result<Option<LocalUser>, CacheError> {
        match get_json(self.store.as_ref(), USER_KEY).await {
            Ok(user) => Ok(user),
            Err(CacheError::Malformed { reason, .. }) => {
                warn!(key = USER_KEY, %reason, "Ignoring malformed local user");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn save(&self, user: &LocalUser) -> Result<(), CacheError> {
        set_json(self.store.as_ref(), USER_KEY, user).await
    }

    /// Create or overwrite the profile, keeping any stored goals.
    pub async fn set_profile(&self, profile: UserProfile) -> Result<LocalUser, CacheError> {
        let mut user = self.load().await?.unwrap_or_default();
        user.profile = profile;
        self.save(&user).await?;
        info!(name = %user.profile.name, "Local profile saved");
        Ok(user)
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.store.remove(USER_KEY).await
    }

    // ── Goals ───────────────────────────────────────────────────────

    pub async fn goals(&self) -> Result<Vec<Goal>, CacheError> {
        Ok(self.load().await?.map(|u| u.goals).unwrap_or_default())
    }

    /// Append a goal. `None` when no local user exists yet.
    pub async fn add_goal(
        &self,
        title: &str,
        description: &str,
        target_date: Option<DateTime<Utc>>,
    ) -> crate::error::Result<Option<Goal>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyField { field: "title" }.into());
        }
        let Some(mut user) = self.load().await? else {
            return Ok(None);
        };

        let mut goal = Goal::new(Uuid::new_v4().to_string(), title).with_description(description.trim());
        goal.target_date = target_date;
        user.goals.push(goal.clone());
        self.save(&user).await?;
        Ok(Some(goal))
    }

    pub async fn update_goal(&self, id: &str, patch: &GoalPatch) -> Result<Option<Goal>, CacheError> {
        self.edit_goal(id, |goal| goal.apply(patch)).await
    }

    pub async fn toggle_goal(&self, id: &str) -> Result<Option<Goal>, CacheError> {
        self.edit_goal(id, |goal| goal.completed = !goal.completed).await
    }

    /// Remove a goal. Returns whether it existed.
    pub async fn remove_goal(&self, id: &str) -> Result<bool, CacheError> {
        let Some(mut user) = self.load().await? else {
            return Ok(false);
        };
        let before = user.goals.len();
        user.goals.retain(|g| g.id != id);
        if user.goals.len() == before {
            return Ok(false);
        }
        self.save(&user).await?;
        Ok(true)
    }

    /// Replace the goal list wholesale.
    pub async fn set_goals(&self, goals: Vec<Goal>) -> Result<(), CacheError> {
        let Some(mut user) = self.load().await? else {
            return Ok(());
        };
        user.goals = goals;
        self.save(&user).await
    }

    async fn edit_goal(
        &self,
        id: &str,
        edit: impl FnOnce(&mut Goal),
    ) -> Result<Option<Goal>, CacheError> {
        let Some(mut user) = self.load().await? else {
            return Ok(None);
        };
        let Some(goal) = user.goals.iter_mut().find(|g| g.id == id) else {
            return Ok(None);
        };
        edit(goal);
        let updated = goal.clone();
        self.save(&user).await?;
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::local::kv::MemoryKv;
    use chrono::NaiveDate;

    fn make_repo() -> (Arc<MemoryKv>, UserRepository) {
        let kv = Arc::new(MemoryKv::new());
        (kv.clone(), UserRepository::new(kv))
    }

    fn profile() -> UserProfile {
        UserProfile::new("Ada", NaiveDate::from_ymd_opt(1990, 6, 15))
    }

    #[tokio::test]
    async fn profile_survives_reload() {
        let (_, repo) = make_repo();
        assert!(repo.load().await.unwrap().is_none());

        repo.set_profile(profile().with_life_expectancy(85)).await.unwrap();
        let user = repo.load().await.unwrap().unwrap();
        assert_eq!(user.profile.name, "Ada");
        assert_eq!(user.profile.life_expectancy(), 85);
        assert!(user.goals.is_empty());
    }

    #[tokio::test]
    async fn stored_life_expectancy_is_reclamped() {
        let (kv, repo) = make_repo();
        kv.set(
            USER_KEY,
            r#"{"name":"Old","birthdate":"1980-01-01","lifeExpectancy":140,"goals":[]}"#,
        )
        .await
        .unwrap();
        let user = repo.load().await.unwrap().unwrap();
        assert_eq!(user.profile.life_expectancy(), 100);
    }

    #[tokio::test]
    async fn malformed_entry_reads_as_absent() {
        let (kv, repo) = make_repo();
        kv.set(USER_KEY, "not json").await.unwrap();
        assert!(repo.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn goals_need_a_user() {
        let (_, repo) = make_repo();
        assert!(repo.add_goal("Travel", "", None).await.unwrap().is_none());

        repo.set_profile(profile()).await.unwrap();
        let goal = repo.add_goal("Travel", "Japan", None).await.unwrap().unwrap();
        let second = repo.add_goal("Read", "", None).await.unwrap().unwrap();

        let titles: Vec<String> = repo.goals().await.unwrap().into_iter().map(|g| g.title).collect();
        assert_eq!(titles, ["Travel", "Read"]);

        let toggled = repo.toggle_goal(&goal.id).await.unwrap().unwrap();
        assert!(toggled.completed);

        assert!(repo.remove_goal(&second.id).await.unwrap());
        assert!(!repo.remove_goal(&second.id).await.unwrap());
        assert_eq!(repo.goals().await.unwrap().len(), 1);

        // Editing the profile keeps the goals.
        repo.set_profile(profile().with_life_expectancy(70)).await.unwrap();
        assert_eq!(repo.goals().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_goal_title_rejected() {
        let (_, repo) = make_repo();
        repo.set_profile(profile()).await.unwrap();
        let err = repo.add_goal("   ", "", None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyField { .. })));
    }
}
