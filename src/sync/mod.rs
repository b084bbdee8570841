//! Optimistic collections kept in step with the store.
//!
//! Each collection holds the signed-in user's rows in memory, applies
//! writes locally before the store confirms them, and refetches when a
//! change arrives from elsewhere.

pub mod collection;
pub mod goals;
pub mod notice;
pub mod optimistic;
pub mod record;
pub mod refresh;
pub mod tasks;
pub mod watch;

pub use collection::{Mutation, RemoteList};
pub use goals::GoalCollection;
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use optimistic::{Settled, Tentative, is_temp_id, temp_id};
pub use record::Record;
pub use refresh::{FetchGuard, with_retry};
pub use tasks::TaskCollection;
pub use watch::{WatchHandle, spawn_change_watcher};
