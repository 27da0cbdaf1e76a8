//! Adapter trait interfaces for rollcall
//!
//! This crate defines the seams between the check-in core and the outside
//! world: the device location source and the attendance REST backend. It
//! also ships a fixed-coordinate provider and mocks for tests.

mod fixed;
mod mock;
mod traits;

pub use fixed::*;
pub use mock::*;
pub use traits::*;
