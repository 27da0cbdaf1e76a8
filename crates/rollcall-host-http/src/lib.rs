//! HTTP adapter for the rollcall attendance backend
//!
//! Provides:
//! - Check-in submission (`POST /attendance`)
//! - Attendance open/close toggling for teachers
//! - Bearer token authentication
//! - Extraction of the backend's `message` field from error responses

mod backend;

pub use backend::*;
