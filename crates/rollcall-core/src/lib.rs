//! Check-in evaluation core for rollcall
//!
//! This crate contains:
//! - The pure eligibility evaluator (session open, schedule window,
//!   device location, geofence radius; first failure wins)
//! - The check-in engine, which fetches a location only when needed,
//!   submits eligible attempts and records successful ones
//! - Core events for observers

mod engine;
mod evaluator;
mod events;

pub use engine::*;
pub use evaluator::*;
pub use events::*;
