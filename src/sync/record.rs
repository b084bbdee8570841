//! Records held by a remote-backed collection.

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::DatabaseError;
use crate::goals::model::Goal;
use crate::store::Database;
use crate::todos::model::Task;

pub trait Record: Clone + Send + Sync + 'static {
    /// Lower-case name used in notices and logs, e.g. `task`.
    const NOUN: &'static str;

    fn id(&self) -> &str;

    /// The authoritative list for a user.
    fn fetch_all<'a>(
        db: &'a dyn Database,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Self>, DatabaseError>>;
}

impl Record for Task {
    const NOUN: &'static str = "task";

    fn id(&self) -> &str {
        &self.id
    }

    fn fetch_all<'a>(
        db: &'a dyn Database,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Self>, DatabaseError>> {
        async move { db.list_tasks(user_id).await }.boxed()
    }
}

impl Record for Goal {
    const NOUN: &'static str = "goal";

    fn id(&self) -> &str {
        &self.id
    }

    fn fetch_all<'a>(
        db: &'a dyn Database,
        user_id: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Self>, DatabaseError>> {
        async move { db.list_goals(user_id).await }.boxed()
    }
}
