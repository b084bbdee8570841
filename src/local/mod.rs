//! Device-local persistence, used before sign-in and handed off after.

pub mod handoff;
pub mod kv;
pub mod tasks;
pub mod user;

pub use handoff::{HandoffReport, push_local_records};
pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use tasks::LocalTasks;
pub use user::{LocalUser, UserRepository};
