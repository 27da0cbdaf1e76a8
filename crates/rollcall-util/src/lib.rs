//! Shared utilities for rollcall
//!
//! This crate provides:
//! - ID types (SessionId, StudentId, AttemptId)
//! - Schedule windows and wall-clock time (with mock time for development)
//! - Great-circle distance between GPS fixes
//! - Error types
//! - Default paths for config and data directories

mod error;
mod geo;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use geo::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
