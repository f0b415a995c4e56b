pub mod config;
pub mod logging;

pub mod control;
pub mod controller;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod materialize;
pub mod progress;
pub mod scrape;
pub mod source;
pub mod store;
