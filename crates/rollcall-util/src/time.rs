//! Time utilities for rollcall
//!
//! Provides wall-clock time and the schedule windows used to decide whether
//! a class session is currently in progress.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `ROLLCALL_MOCK_TIME` environment variable can be set
//! to override the system time for all schedule checks. This is useful for
//! exercising check-in windows outside of class hours.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-29 10:00:00`)
//!
//! Example:
//! ```bash
//! ROLLCALL_MOCK_TIME="2025-12-29 10:00:00" rollcall schedule Mon 09:00-12:00
//! ```
//!
//! # Known limitation
//!
//! Schedule windows never cross midnight. A range such as `23:00-01:00` has
//! `start > end` and therefore never matches.

use chrono::{DateTime, Datelike, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use crate::{Result, RollcallError};

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "ROLLCALL_MOCK_TIME";

/// Format accepted by `ROLLCALL_MOCK_TIME`
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                if let Ok(naive_dt) = NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) {
                    if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    }
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        "Failed to convert mock time to local timezone"
                    );
                } else {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = MOCK_TIME_FORMAT,
                        "Invalid mock time format"
                    );
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Wall-clock time of day with minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    /// Minutes since midnight, in `0..1440`
    pub fn minute_of_day(&self) -> u16 {
        (self.hour as u16) * 60 + self.minute as u16
    }

    /// Parse `HH:MM`. Each side is trimmed and parsed as an integer.
    pub fn parse(s: &str) -> Result<Self> {
        let (hour, minute) = s
            .split_once(':')
            .ok_or_else(|| RollcallError::time_range(s, "expected HH:MM"))?;

        let hour: u8 = hour
            .trim()
            .parse()
            .map_err(|_| RollcallError::time_range(s, "invalid hour"))?;
        let minute: u8 = minute
            .trim()
            .parse()
            .map_err(|_| RollcallError::time_range(s, "invalid minute"))?;

        Self::new(hour, minute)
            .ok_or_else(|| RollcallError::time_range(s, "hour must be 0-23 and minute 0-59"))
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.minute_of_day().cmp(&other.minute_of_day())
    }
}

/// Day lookup table, keyed by the first three lower-case letters
const DAY_TABLE: [(&str, Weekday); 7] = [
    ("sun", Weekday::Sun),
    ("mon", Weekday::Mon),
    ("tue", Weekday::Tue),
    ("wed", Weekday::Wed),
    ("thu", Weekday::Thu),
    ("fri", Weekday::Fri),
    ("sat", Weekday::Sat),
];

/// Parse a free-form day name ("Mon", "monday", " TUESDAY ").
///
/// The text is trimmed, lower-cased and truncated to three characters
/// before lookup, so anything starting with a known abbreviation matches.
pub fn parse_weekday(text: &str) -> Result<Weekday> {
    let key: String = text.trim().to_lowercase().chars().take(3).collect();
    DAY_TABLE
        .iter()
        .find(|(abbrev, _)| *abbrev == key)
        .map(|(_, day)| *day)
        .ok_or_else(|| RollcallError::InvalidDay(text.to_string()))
}

/// Parse `HH:MM-HH:MM` into its two bounds.
pub fn parse_time_range(text: &str) -> Result<(WallClock, WallClock)> {
    let (start, end) = text
        .split_once('-')
        .ok_or_else(|| RollcallError::time_range(text, "expected HH:MM-HH:MM"))?;
    Ok((WallClock::parse(start)?, WallClock::parse(end)?))
}

/// A weekly window during which a class session accepts check-ins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub day: Weekday,
    pub start: WallClock,
    pub end: WallClock,
}

impl ScheduleWindow {
    pub fn new(day: Weekday, start: WallClock, end: WallClock) -> Self {
        Self { day, start, end }
    }

    /// Build a window from a day name and a `HH:MM-HH:MM` range
    pub fn parse(day_text: &str, time_range_text: &str) -> Result<Self> {
        let day = parse_weekday(day_text)?;
        let (start, end) = parse_time_range(time_range_text)?;
        Ok(Self { day, start, end })
    }

    /// Build a window from a combined `"Www HH:MM-HH:MM"` descriptor
    pub fn parse_descriptor(text: &str) -> Result<Self> {
        let mut parts = text.split_whitespace();
        let (Some(day), Some(range), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RollcallError::time_range(text, "expected \"Www HH:MM-HH:MM\""));
        };
        Self::parse(day, range)
    }

    /// Whether `start <= end`. Inverted windows are kept but never match.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Check if the given local datetime falls within this window.
    /// Both bounds are inclusive.
    pub fn contains(&self, dt: &DateTime<Local>) -> bool {
        if dt.weekday() != self.day {
            return false;
        }

        let minute = WallClock::from_naive_time(dt.time()).minute_of_day();
        self.start.minute_of_day() <= minute && minute <= self.end.minute_of_day()
    }

    /// Time left until the window closes, if `dt` is inside it
    pub fn remaining_duration(&self, dt: &DateTime<Local>) -> Option<Duration> {
        if !self.contains(dt) {
            return None;
        }

        let now_secs = dt.time().num_seconds_from_midnight();
        let end_secs = self.end.minute_of_day() as u32 * 60 + 59;
        Some(Duration::from_secs(end_secs.saturating_sub(now_secs) as u64))
    }
}

/// An explicit window between two instants (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl InstantWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, dt: &DateTime<Local>) -> bool {
        let dt = dt.with_timezone(&Utc);
        self.start <= dt && dt <= self.end
    }

    pub fn remaining_duration(&self, dt: &DateTime<Local>) -> Option<Duration> {
        if !self.contains(dt) {
            return None;
        }
        (self.end - dt.with_timezone(&Utc)).to_std().ok()
    }
}

/// Check whether `now` falls inside the weekly window described by
/// `day_text` and `time_range_text`.
///
/// Malformed input never raises: it is logged and treated as "not in
/// progress", so bad schedule data degrades to "never eligible".
pub fn is_within_schedule(day_text: &str, time_range_text: &str, now: &DateTime<Local>) -> bool {
    match ScheduleWindow::parse(day_text, time_range_text) {
        Ok(window) => window.contains(now),
        Err(e) => {
            debug!(day = day_text, time = time_range_text, error = %e, "Unparseable schedule");
            false
        }
    }
}

/// Same as [`is_within_schedule`] against the current (possibly mocked) time
pub fn is_within_schedule_now(day_text: &str, time_range_text: &str) -> bool {
    is_within_schedule(day_text, time_range_text, &now())
}

/// Same as [`is_within_schedule`] for a combined `"Www HH:MM-HH:MM"` descriptor
pub fn is_within_schedule_text(text: &str, now: &DateTime<Local>) -> bool {
    match ScheduleWindow::parse_descriptor(text) {
        Ok(window) => window.contains(now),
        Err(e) => {
            debug!(schedule = text, error = %e, "Unparseable schedule");
            false
        }
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
