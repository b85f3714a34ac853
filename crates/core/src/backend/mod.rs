//! Conversion backend abstraction.
//!
//! This module provides a `ConversionBackend` trait for the service that
//! actually downloads and converts media, and an HTTP implementation of it.

mod config;
mod http;
mod types;

pub use config::BackendConfig;
pub use http::HttpBackend;
pub use types::{BackendError, ConversionBackend, ProgressReport};
