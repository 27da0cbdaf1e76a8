//! Error types for rollcall

use thiserror::Error;

/// Errors raised while parsing schedule text or coordinates
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RollcallError {
    #[error("Unknown day: {0:?}")]
    InvalidDay(String),

    #[error("Invalid time range '{value}': {message}")]
    InvalidTimeRange { value: String, message: String },

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

impl RollcallError {
    pub fn time_range(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTimeRange {
            value: value.into(),
            message: message.into(),
        }
    }

    pub fn coordinate(msg: impl Into<String>) -> Self {
        Self::InvalidCoordinate(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, RollcallError>;
