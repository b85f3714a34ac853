//! Progress polling for submitted jobs.
//!
//! The poller queries the backend for one job on a fixed interval and turns
//! the answers into ordered [`PollEvent`]s:
//! - `Progress` while the job runs
//! - `Completed` once, when the backend reports 100%
//! - `Failed` once, when the backend reports failure, polling faults exceed
//!   the configured threshold, or progress stalls

mod config;
mod runner;
mod types;

pub use config::PollerConfig;
pub use runner::{PollHandle, ProgressPoller};
pub use types::PollEvent;
