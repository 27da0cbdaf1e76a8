//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Backend and local storage settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Geofence settings
    #[serde(default)]
    pub geofence: RawGeofence,

    /// Device location request settings
    #[serde(default)]
    pub location: RawLocation,

    /// What gets recorded on a successful check-in
    #[serde(default)]
    pub submission: RawSubmission,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Base URL of the attendance REST API (default: http://localhost:3000)
    pub api_base_url: Option<String>,

    /// Data directory for the local store
    pub data_dir: Option<PathBuf>,
}

/// Geofence settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawGeofence {
    /// Allowed distance from the session's target location, in meters
    pub radius_meters: Option<f64>,
}

/// Location request settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLocation {
    /// How long to wait for a GPS fix
    pub timeout_seconds: Option<u64>,

    /// Request a high-accuracy fix
    pub high_accuracy: Option<bool>,
}

/// Submission settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSubmission {
    /// Status recorded: "present", "late", "absent", "excused"
    pub status: Option<String>,
}
