//! CLI command handlers. Each command is in its own file.

mod cancel;
mod status;
mod tasks;

pub use cancel::run_cancel;
pub use status::run_status;
pub use tasks::run_tasks;
