//! Validated policy structures

use crate::schema::{RawConfig, RawGeofence, RawLocation, RawServiceConfig, RawSubmission};
use rollcall_api::AttendanceStatus;
use rollcall_util::default_data_dir;
use std::path::PathBuf;
use std::time::Duration;

/// Default geofence radius in meters
pub const DEFAULT_RADIUS_METERS: f64 = 50.0;

/// Default wait for a GPS fix
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default attendance backend
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

/// Validated policy ready for use by the core engine
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub service: ServiceConfig,
    pub geofence: GeofencePolicy,
    pub location: LocationPolicy,
    pub submission: SubmissionPolicy,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            geofence: GeofencePolicy::from_raw(raw.geofence),
            location: LocationPolicy::from_raw(raw.location),
            submission: SubmissionPolicy::from_raw(raw.submission),
        }
    }
}

/// Backend and storage configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub api_base_url: String,
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            api_base_url: raw
                .api_base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// Geofence applied to sessions that declare a target location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofencePolicy {
    pub radius_meters: f64,
}

impl GeofencePolicy {
    pub fn new(radius_meters: f64) -> Self {
        Self { radius_meters }
    }

    fn from_raw(raw: RawGeofence) -> Self {
        Self {
            radius_meters: raw.radius_meters.unwrap_or(DEFAULT_RADIUS_METERS),
        }
    }
}

impl Default for GeofencePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS_METERS)
    }
}

/// How the device location is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationPolicy {
    pub timeout: Duration,
    pub high_accuracy: bool,
}

impl LocationPolicy {
    fn from_raw(raw: RawLocation) -> Self {
        Self {
            timeout: raw
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_LOCATION_TIMEOUT),
            high_accuracy: raw.high_accuracy.unwrap_or(true),
        }
    }
}

impl Default for LocationPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOCATION_TIMEOUT,
            high_accuracy: true,
        }
    }
}

/// What gets recorded with an accepted check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubmissionPolicy {
    pub status: AttendanceStatus,
}

impl SubmissionPolicy {
    fn from_raw(raw: RawSubmission) -> Self {
        Self {
            // Checked by validate_config
            status: raw
                .status
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}
