//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Every committed write is
//! also broadcast as a [`ChangeEvent`], standing in for a realtime feed.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, Transaction, params};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::goals::model::{Goal, GoalPatch, GoalStep};
use crate::store::migrations;
use crate::store::traits::{ChangeEvent, ChangeKind, ChangeTable, Database};
use crate::sync::optimistic::is_temp_id;
use crate::todos::model::{Priority, Task, TaskPatch};

/// Buffered change events per subscriber before the slowest lags.
const CHANGE_CAPACITY: usize = 256;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    changes: broadcast::Sender<ChangeEvent>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            db: Arc::new(db),
            conn,
            changes,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    fn notify(&self, user_id: &str, table: ChangeTable, kind: ChangeKind, id: &str) {
        // No subscribers is fine.
        let _ = self.changes.send(ChangeEvent {
            user_id: user_id.to_string(),
            table,
            kind,
            id: id.to_string(),
        });
    }

    async fn get_task(&self, user_id: &str, id: &str) -> Result<Option<Task>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM todos WHERE user_id = ?1 AND id = ?2"),
                params![user_id, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_task: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_task(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_task row: {e}"))),
        }
    }

    async fn get_goal(&self, user_id: &str, id: &str) -> Result<Option<Goal>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = ?1 AND id = ?2"),
                params![user_id, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_goal: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_goal(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_goal row: {e}"))),
        }
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.filter(|s| !s.is_empty()).map(|s| parse_datetime(&s))
}

fn column_err(column: &str) -> impl Fn(libsql::Error) -> DatabaseError + '_ {
    move |e| DatabaseError::Query(format!("{column}: {e}"))
}

/// Column list for task SELECT queries.
const TASK_COLUMNS: &str = "id, text, completed, created_at, completed_at, due_date, priority";

fn row_to_task(row: &libsql::Row) -> Result<Task, DatabaseError> {
    let id: String = row.get(0).map_err(column_err("todo.id"))?;
    let text: String = row.get(1).map_err(column_err("todo.text"))?;
    let completed = row.get::<i64>(2).unwrap_or(0) != 0;
    let created_str: String = row.get(3).map_err(column_err("todo.created_at"))?;
    let completed_at = parse_optional_datetime(row.get(4).ok());
    let due_date = parse_optional_datetime(row.get(5).ok());
    // NULL for rows written before priorities existed.
    let priority = row
        .get::<String>(6)
        .ok()
        .and_then(|s| s.parse::<Priority>().ok())
        .unwrap_or_default();

    Ok(Task {
        id,
        text,
        completed,
        created_at: parse_datetime(&created_str),
        completed_at,
        due_date,
        priority,
    })
}

/// Column list for goal SELECT queries.
const GOAL_COLUMNS: &str = "id, title, description, target_date, completed";

fn row_to_goal(row: &libsql::Row) -> Result<Goal, DatabaseError> {
    Ok(Goal {
        id: row.get(0).map_err(column_err("goal.id"))?,
        title: row.get(1).map_err(column_err("goal.title"))?,
        description: row.get::<String>(2).unwrap_or_default(),
        target_date: parse_optional_datetime(row.get(3).ok()),
        completed: row.get::<i64>(4).unwrap_or(0) != 0,
    })
}

/// Column list for goal step SELECT queries.
const STEP_COLUMNS: &str = "id, goal_id, title, description, step_order, completed";

fn row_to_step(row: &libsql::Row) -> Result<GoalStep, DatabaseError> {
    Ok(GoalStep {
        id: row.get(0).map_err(column_err("step.id"))?,
        goal_id: row.get(1).map_err(column_err("step.goal_id"))?,
        title: row.get(2).map_err(column_err("step.title"))?,
        description: row.get::<String>(3).unwrap_or_default(),
        order: row.get::<i64>(4).unwrap_or(0).max(0) as u32,
        completed: row.get::<i64>(5).unwrap_or(0) != 0,
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Tasks ───────────────────────────────────────────────────────

    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM todos WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_tasks: {e}")))?;

        let mut tasks = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            tasks.push(row_to_task(&row)?);
        }
        Ok(tasks)
    }

    async fn insert_task(&self, user_id: &str, task: &Task) -> Result<Option<Task>, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let completed_at = task
            .completed
            .then(|| task.completed_at.unwrap_or_else(Utc::now));

        self.conn()
            .execute(
                "INSERT INTO todos (id, user_id, text, completed, created_at, completed_at, due_date, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.as_str(),
                    user_id,
                    task.text.as_str(),
                    task.completed as i64,
                    task.created_at.to_rfc3339(),
                    completed_at.map(|d| d.to_rfc3339()),
                    task.due_date.map(|d| d.to_rfc3339()),
                    task.priority.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_task: {e}")))?;

        debug!(task_id = %id, "Task row inserted");
        self.notify(user_id, ChangeTable::Todos, ChangeKind::Insert, &id);
        self.get_task(user_id, &id).await
    }

    async fn update_task(
        &self,
        user_id: &str,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<Task, DatabaseError> {
        let mut task = self
            .get_task(user_id, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "task".into(),
                id: id.to_string(),
            })?;
        task.apply(patch, Utc::now());

        self.conn()
            .execute(
                "UPDATE todos SET text = ?1, completed = ?2, completed_at = ?3, due_date = ?4, priority = ?5
                 WHERE user_id = ?6 AND id = ?7",
                params![
                    task.text.as_str(),
                    task.completed as i64,
                    task.completed_at.map(|d| d.to_rfc3339()),
                    task.due_date.map(|d| d.to_rfc3339()),
                    task.priority.as_str(),
                    user_id,
                    id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_task: {e}")))?;

        debug!(task_id = %id, "Task row updated");
        self.notify(user_id, ChangeTable::Todos, ChangeKind::Update, id);
        Ok(task)
    }

    async fn delete_task(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM todos WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_task: {e}")))?;

        if count > 0 {
            self.notify(user_id, ChangeTable::Todos, ChangeKind::Delete, id);
        }
        Ok(count > 0)
    }

    // ── Goals ───────────────────────────────────────────────────────

    async fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_goals: {e}")))?;

        let mut goals = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            goals.push(row_to_goal(&row)?);
        }
        Ok(goals)
    }

    async fn insert_goal(&self, user_id: &str, goal: &Goal) -> Result<Option<Goal>, DatabaseError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO goals (id, user_id, title, description, target_date, completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    id.as_str(),
                    user_id,
                    goal.title.as_str(),
                    goal.description.as_str(),
                    goal.target_date.map(|d| d.to_rfc3339()),
                    goal.completed as i64,
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_goal: {e}")))?;

        debug!(goal_id = %id, "Goal row inserted");
        self.notify(user_id, ChangeTable::Goals, ChangeKind::Insert, &id);
        self.get_goal(user_id, &id).await
    }

    async fn update_goal(
        &self,
        user_id: &str,
        id: &str,
        patch: &GoalPatch,
    ) -> Result<Goal, DatabaseError> {
        let mut goal = self
            .get_goal(user_id, id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "goal".into(),
                id: id.to_string(),
            })?;
        goal.apply(patch);

        self.conn()
            .execute(
                "UPDATE goals SET title = ?1, description = ?2, target_date = ?3, completed = ?4, updated_at = ?5
                 WHERE user_id = ?6 AND id = ?7",
                params![
                    goal.title.as_str(),
                    goal.description.as_str(),
                    goal.target_date.map(|d| d.to_rfc3339()),
                    goal.completed as i64,
                    Utc::now().to_rfc3339(),
                    user_id,
                    id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_goal: {e}")))?;

        debug!(goal_id = %id, "Goal row updated");
        self.notify(user_id, ChangeTable::Goals, ChangeKind::Update, id);
        Ok(goal)
    }

    async fn delete_goal(&self, user_id: &str, id: &str) -> Result<bool, DatabaseError> {
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_goal begin: {e}")))?;

        let deleted = async {
            tx.execute(
                "DELETE FROM goal_steps WHERE user_id = ?1 AND goal_id = ?2",
                params![user_id, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_goal steps: {e}")))?;

            tx.execute(
                "DELETE FROM goals WHERE user_id = ?1 AND id = ?2",
                params![user_id, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_goal: {e}")))
        }
        .await;
        let count = finish(tx, deleted, "delete_goal").await?;

        if count > 0 {
            self.notify(user_id, ChangeTable::Goals, ChangeKind::Delete, id);
        }
        Ok(count > 0)
    }

    // ── Goal steps ──────────────────────────────────────────────────

    async fn list_goal_steps(
        &self,
        user_id: &str,
        goal_id: &str,
    ) -> Result<Vec<GoalStep>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {STEP_COLUMNS} FROM goal_steps WHERE user_id = ?1 AND goal_id = ?2 ORDER BY step_order ASC"
                ),
                params![user_id, goal_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_goal_steps: {e}")))?;

        let mut steps = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            steps.push(row_to_step(&row)?);
        }
        Ok(steps)
    }

    async fn replace_goal_steps(
        &self,
        user_id: &str,
        goal_id: &str,
        steps: &[GoalStep],
    ) -> Result<Vec<GoalStep>, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("replace_goal_steps begin: {e}")))?;

        let written = async {
            tx.execute(
                "DELETE FROM goal_steps WHERE user_id = ?1 AND goal_id = ?2",
                params![user_id, goal_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("replace_goal_steps clear: {e}")))?;

            for (order, step) in steps.iter().enumerate() {
                let id = if step.id.is_empty() || is_temp_id(&step.id) {
                    Uuid::new_v4().to_string()
                } else {
                    step.id.clone()
                };
                tx.execute(
                    "INSERT INTO goal_steps (id, goal_id, user_id, title, description, completed, step_order, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                    params![
                        id,
                        goal_id,
                        user_id,
                        step.title.as_str(),
                        step.description.as_str(),
                        step.completed as i64,
                        order as i64,
                        now.as_str(),
                    ],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("replace_goal_steps insert: {e}")))?;
            }
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, written, "replace_goal_steps").await?;

        debug!(goal_id, count = steps.len(), "Goal steps replaced");
        self.notify(user_id, ChangeTable::GoalSteps, ChangeKind::Update, goal_id);
        self.list_goal_steps(user_id, goal_id).await
    }

    async fn update_goal_step(&self, user_id: &str, step: &GoalStep) -> Result<(), DatabaseError> {
        let count = self
            .conn()
            .execute(
                "UPDATE goal_steps SET title = ?1, description = ?2, completed = ?3, updated_at = ?4
                 WHERE user_id = ?5 AND id = ?6",
                params![
                    step.title.as_str(),
                    step.description.as_str(),
                    step.completed as i64,
                    Utc::now().to_rfc3339(),
                    user_id,
                    step.id.as_str(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_goal_step: {e}")))?;

        if count == 0 {
            return Err(DatabaseError::NotFound {
                entity: "goal step".into(),
                id: step.id.clone(),
            });
        }
        self.notify(user_id, ChangeTable::GoalSteps, ChangeKind::Update, &step.id);
        Ok(())
    }

    async fn delete_goal_step(
        &self,
        user_id: &str,
        goal_id: &str,
        step_id: &str,
    ) -> Result<Vec<GoalStep>, DatabaseError> {
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_goal_step begin: {e}")))?;

        let renumbered = async {
            tx.execute(
                "DELETE FROM goal_steps WHERE user_id = ?1 AND goal_id = ?2 AND id = ?3",
                params![user_id, goal_id, step_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_goal_step: {e}")))?;

            // Close the gap left in step_order.
            let mut rows = tx
                .query(
                    "SELECT id FROM goal_steps WHERE user_id = ?1 AND goal_id = ?2 ORDER BY step_order ASC",
                    params![user_id, goal_id],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("delete_goal_step list: {e}")))?;
            let mut ids = Vec::new();
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| DatabaseError::Query(format!("delete_goal_step list: {e}")))?
            {
                ids.push(row.get::<String>(0).map_err(column_err("id"))?);
            }

            for (order, id) in ids.iter().enumerate() {
                tx.execute(
                    "UPDATE goal_steps SET step_order = ?1 WHERE user_id = ?2 AND id = ?3",
                    params![order as i64, user_id, id.as_str()],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("delete_goal_step renumber: {e}")))?;
            }
            Ok::<_, DatabaseError>(())
        }
        .await;
        finish(tx, renumbered, "delete_goal_step").await?;

        self.notify(user_id, ChangeTable::GoalSteps, ChangeKind::Delete, step_id);
        self.list_goal_steps(user_id, goal_id).await
    }

    // ── Settings ────────────────────────────────────────────────────

    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row.get(0).unwrap_or_else(|_| "null".to_string());
                let value: serde_json::Value =
                    serde_json::from_str(&value_str).unwrap_or(serde_json::Value::Null);
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let value_str = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
                params![user_id, key, value_str, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;

        self.notify(user_id, ChangeTable::Settings, ChangeKind::Update, key);
        Ok(())
    }

    // ── Realtime ────────────────────────────────────────────────────

    fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

/// Commit `tx` if `outcome` succeeded, otherwise roll it back.
async fn finish<T>(
    tx: Transaction,
    outcome: Result<T, DatabaseError>,
    op: &str,
) -> Result<T, DatabaseError> {
    match outcome {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DatabaseError::Query(format!("{op} commit: {e}")))?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(op, error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}
