//! Persistence layer — libSQL-backed storage for tasks, goals, and settings.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{ChangeEvent, ChangeKind, ChangeTable, Database, PROFILE_KEY};
