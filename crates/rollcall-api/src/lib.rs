//! Shared types for rollcall
//!
//! This crate defines the types exchanged with the attendance backend and
//! handed to callers of the evaluator:
//! - Session records and schedule descriptors
//! - Reason codes and check-in verdicts
//! - Check-in submissions and receipts

mod types;

pub use types::*;
