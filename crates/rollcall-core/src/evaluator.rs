//! Eligibility rules
//!
//! Everything here is a function of (session, device location, now, radius).
//! Nothing reads the clock, the store, or the device on its own.

use chrono::{DateTime, Local};
use rollcall_api::{CheckInDecision, CheckInVerdict, ReasonCode, SessionRecord};
use rollcall_config::GeofencePolicy;
use rollcall_util::{GeoPoint, Geofence};

/// Steps that need no location: the open flag, then the schedule window.
///
/// The engine runs this before asking the device for a position, so a
/// closed or out-of-window session never triggers a GPS request.
pub fn check_availability(session: &SessionRecord, now: &DateTime<Local>) -> Result<(), ReasonCode> {
    if !session.is_attendance_open {
        return Err(ReasonCode::SessionClosed);
    }

    if !session.schedule.contains(now) {
        return Err(ReasonCode::OutsideScheduledTime);
    }

    Ok(())
}

/// Whether evaluating this session needs a device position
pub fn needs_location(session: &SessionRecord) -> bool {
    session.location.is_some()
}

/// Full eligibility decision. `device_location` is `None` when the device
/// could not produce a fix (unsupported, denied or timed out).
pub fn evaluate_check_in(
    session: &SessionRecord,
    device_location: Option<GeoPoint>,
    now: &DateTime<Local>,
    geofence: &GeofencePolicy,
) -> CheckInDecision {
    if let Err(reason) = check_availability(session, now) {
        return CheckInDecision::Denied(reason);
    }

    let Some(target) = session.location else {
        return CheckInDecision::Eligible {
            distance_meters: None,
        };
    };

    let Some(device) = device_location else {
        return CheckInDecision::Denied(ReasonCode::LocationUnavailable);
    };

    let fence = Geofence::new(target, geofence.radius_meters);
    let (distance_meters, inside) = fence.check(&device);

    if !inside {
        return CheckInDecision::Denied(ReasonCode::OutOfRange {
            distance_meters,
            radius_meters: geofence.radius_meters,
        });
    }

    CheckInDecision::Eligible {
        distance_meters: Some(distance_meters),
    }
}

/// [`evaluate_check_in`] flattened to `{ eligible, reason_code?, distance_meters? }`
pub fn evaluate_verdict(
    session: &SessionRecord,
    device_location: Option<GeoPoint>,
    now: &DateTime<Local>,
    geofence: &GeofencePolicy,
) -> CheckInVerdict {
    CheckInVerdict::from(&evaluate_check_in(session, device_location, now, geofence))
}
