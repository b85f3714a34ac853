//! Job lifecycle coordination.
//!
//! The coordinator owns the single active job and drives it through the
//! state machine:
//! - **Submit**: validate, then create the backend job (`Submitting`)
//! - **Track**: poll progress until a terminal event (`InProgress`)
//! - **Finish**: publish the artifact reference (`Ready`) or the failure
//!   reason (`Failed`)
//!
//! `reset()` cancels whatever is running and returns to `Idle`.

mod config;
mod runner;
mod types;

pub use config::CoordinatorConfig;
pub use runner::JobCoordinator;
pub use types::CoordinatorError;
