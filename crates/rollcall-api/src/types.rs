//! Shared types for the rollcall API

use chrono::{DateTime, Local, Utc};
use rollcall_util::{GeoPoint, InstantWindow, ScheduleWindow, SessionId, StudentId, is_within_schedule};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// When a session accepts check-ins, as declared by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleDescriptor {
    /// Recurring weekly slot: `day` is a free-form day name, `time` is `HH:MM-HH:MM`
    Weekly { day: String, time: String },
    /// One-off occurrence between two instants
    Window {
        #[serde(rename = "scheduledStart")]
        start: DateTime<Utc>,
        #[serde(rename = "scheduledEnd")]
        end: DateTime<Utc>,
    },
}

impl ScheduleDescriptor {
    pub fn weekly(day: impl Into<String>, time: impl Into<String>) -> Self {
        Self::Weekly {
            day: day.into(),
            time: time.into(),
        }
    }

    /// Whether the session is in progress at `now`. Malformed weekly text is never in progress.
    pub fn contains(&self, now: &DateTime<Local>) -> bool {
        match self {
            Self::Weekly { day, time } => is_within_schedule(day, time, now),
            Self::Window { start, end } => InstantWindow::new(*start, *end).contains(now),
        }
    }

    /// Time left before the window closes, if it is open at `now`
    pub fn remaining(&self, now: &DateTime<Local>) -> Option<Duration> {
        match self {
            Self::Weekly { day, time } => ScheduleWindow::parse(day, time)
                .ok()
                .and_then(|w| w.remaining_duration(now)),
            Self::Window { start, end } => InstantWindow::new(*start, *end).remaining_duration(now),
        }
    }
}

impl fmt::Display for ScheduleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly { day, time } => write!(f, "{} {}", day, time),
            Self::Window { start, end } => write!(f, "{} - {}", start.to_rfc3339(), end.to_rfc3339()),
        }
    }
}

/// A class session as returned by the attendance backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    #[serde(alias = "_id")]
    pub id: SessionId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub course_code: Option<String>,

    /// Open/closed attendance flag, toggled by the teacher
    pub is_attendance_open: bool,

    /// Either `day`/`time` or `scheduledStart`/`scheduledEnd`, inline in the record
    #[serde(flatten)]
    pub schedule: ScheduleDescriptor,

    /// Target location; sessions without one skip the geofence check
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// Structured reason codes for why a check-in is not permitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ReasonCode {
    /// Attendance is not open for this session
    SessionClosed,
    /// Current time is outside the schedule window, or the schedule is malformed
    OutsideScheduledTime,
    /// The device could not produce a GPS fix (unsupported, denied, or timed out)
    LocationUnavailable,
    /// Device is farther from the target than the allowed radius
    OutOfRange {
        distance_meters: f64,
        radius_meters: f64,
    },
    /// The backend rejected or failed the submission; the attempt may be retried
    SubmissionFailed { message: Option<String> },
    /// This session is already in the local checked set
    AlreadyCheckedIn,
}

impl ReasonCode {
    /// Stable snake_case code, matching the serialized `code` tag
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionClosed => "session_closed",
            Self::OutsideScheduledTime => "outside_scheduled_time",
            Self::LocationUnavailable => "location_unavailable",
            Self::OutOfRange { .. } => "out_of_range",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::AlreadyCheckedIn => "already_checked_in",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionClosed => write!(f, "attendance is closed for this session"),
            Self::OutsideScheduledTime => write!(f, "outside the scheduled class time"),
            Self::LocationUnavailable => write!(f, "location unavailable"),
            Self::OutOfRange {
                distance_meters,
                radius_meters,
            } => write!(
                f,
                "{:.0} m from the classroom (limit {:.0} m)",
                distance_meters, radius_meters
            ),
            Self::SubmissionFailed { message: Some(m) } => write!(f, "submission failed: {}", m),
            Self::SubmissionFailed { message: None } => write!(f, "submission failed"),
            Self::AlreadyCheckedIn => write!(f, "already checked in"),
        }
    }
}

/// Result of evaluating a check-in attempt
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInDecision {
    /// Permitted; carries the measured distance when the session has a target location
    Eligible { distance_meters: Option<f64> },
    Denied(ReasonCode),
}

impl CheckInDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }

    pub fn reason(&self) -> Option<&ReasonCode> {
        match self {
            Self::Eligible { .. } => None,
            Self::Denied(reason) => Some(reason),
        }
    }

    pub fn distance_meters(&self) -> Option<f64> {
        match self {
            Self::Eligible { distance_meters } => *distance_meters,
            Self::Denied(ReasonCode::OutOfRange {
                distance_meters, ..
            }) => Some(*distance_meters),
            Self::Denied(_) => None,
        }
    }
}

/// Flattened decision for callers that only want fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInVerdict {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<ReasonCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

impl From<&CheckInDecision> for CheckInVerdict {
    fn from(decision: &CheckInDecision) -> Self {
        Self {
            eligible: decision.is_eligible(),
            reason_code: decision.reason().cloned(),
            distance_meters: decision.distance_meters(),
        }
    }
}

/// Attendance status recorded with a check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
            Self::Excused => "excused",
        }
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "late" => Ok(Self::Late),
            "excused" => Ok(Self::Excused),
            other => Err(format!("Unknown attendance status: {}", other)),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body sent to the attendance backend for an eligible check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInSubmission {
    pub session_id: SessionId,
    pub student_id: StudentId,
    pub timestamp: DateTime<Utc>,
    pub status: AttendanceStatus,
}

/// Backend acknowledgement of an accepted check-in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    #[serde(default, alias = "_id")]
    pub record_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// View of a session for listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub title: String,
    pub course_code: Option<String>,
    pub open: bool,
    /// Inside the schedule window right now
    pub in_progress: bool,
    /// Present in the local checked set
    pub already_checked: bool,
    /// Open, in progress, and not yet checked
    pub can_check_in: bool,
    /// Time left in the window, if in progress
    pub closes_in: Option<Duration>,
}
