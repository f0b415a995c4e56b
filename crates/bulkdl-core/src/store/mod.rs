//! Persistent job store (SQLite via sqlx).
//!
//! Two tables: `active_jobs` holds job definitions, `tasks` holds per-item
//! completion status keyed by `(job_id, item_id, location_id)`. No other
//! component touches disk state directly.

pub mod db;
pub mod jobs;
pub mod tasks;
pub mod types;

pub use db::TaskDb;
pub use types::*;
