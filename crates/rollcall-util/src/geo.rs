//! Geographic coordinates and great-circle distance
//!
//! Distances use the haversine formula on a sphere with the mean Earth
//! radius. That is accurate to well under a meter at campus scale (tens to
//! low thousands of meters), which is all a geofence needs.

use serde::{Deserialize, Serialize};

use crate::{Result, RollcallError};

/// Mean Earth radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A GPS coordinate in decimal degrees.
///
/// Deserialization goes through [`GeoPoint::new`], so out-of-range input
/// is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = RollcallError;

    fn try_from(raw: RawGeoPoint) -> Result<Self> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl GeoPoint {
    /// Create a validated coordinate.
    ///
    /// Returns `Err(RollcallError::InvalidCoordinate)` if either component
    /// is non-finite or out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(RollcallError::coordinate(format!(
                "latitude {} out of range [-90, 90]",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(RollcallError::coordinate(format!(
                "longitude {} out of range [-180, 180]",
                longitude
            )));
        }
        Ok(Self { latitude, longitude })
    }

    /// Create a coordinate without validation. Use with trusted inputs only.
    #[inline]
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_meters(self, other)
    }
}

/// Great-circle distance between two points, in meters
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for antipodal inputs
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).sqrt())
}

/// A circular area around a target coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl Geofence {
    pub fn new(center: GeoPoint, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters,
        }
    }

    /// Distance from the center, and whether that is within the radius
    /// (the boundary itself counts as inside)
    pub fn check(&self, point: &GeoPoint) -> (f64, bool) {
        let distance = self.center.distance_to(point);
        (distance, distance <= self.radius_meters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn north_of(p: GeoPoint, meters: f64) -> GeoPoint {
        let d_lat = (meters / EARTH_RADIUS_METERS).to_degrees();
        GeoPoint::new_unchecked(p.latitude + d_lat, p.longitude)
    }

    #[test]
    fn distance_to_self_is_zero() {
        for p in [
            GeoPoint::new_unchecked(0.0, 0.0),
            GeoPoint::new_unchecked(13.7563, 100.5018),
            GeoPoint::new_unchecked(-33.8688, 151.2093),
            GeoPoint::new_unchecked(89.9, -179.9),
        ] {
            assert_eq!(distance_meters(&p, &p), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint::new_unchecked(13.7563, 100.5018);
        let b = GeoPoint::new_unchecked(13.7650, 100.5381);
        let ab = distance_meters(&a, &b);
        let ba = distance_meters(&b, &a);
        assert!((ab - ba).abs() < 1e-9, "{ab} vs {ba}");
    }

    #[test]
    fn fifty_meter_fixture_at_equator() {
        let a = GeoPoint::new_unchecked(0.0, 0.0);
        let b = GeoPoint::new_unchecked(0.00045, 0.0);
        let d = distance_meters(&a, &b);
        assert!((d - 50.0).abs() / 50.0 < 0.01, "got {d}");
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let a = GeoPoint::new_unchecked(0.0, 0.0);
        let b = GeoPoint::new_unchecked(0.0, 1.0);
        let expected = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
        assert!((distance_meters(&a, &b) - expected).abs() < 1e-6);
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let a = GeoPoint::new_unchecked(0.0, 0.0);
        let b = GeoPoint::new_unchecked(0.0, 180.0);
        let expected = EARTH_RADIUS_METERS * std::f64::consts::PI;
        assert!((distance_meters(&a, &b) - expected).abs() < 1e-3);
    }

    #[test]
    fn geofence_boundary() {
        let center = GeoPoint::new_unchecked(13.7563, 100.5018);
        let fence = Geofence::new(center, 50.0);

        let (d, inside) = fence.check(&north_of(center, 10.0));
        assert!(inside);
        assert!((d - 10.0).abs() < 0.01);

        let (d, inside) = fence.check(&north_of(center, 200.0));
        assert!(!inside);
        assert!((d - 200.0).abs() < 0.01);
    }

    #[test]
    fn deserialize_validates_range() {
        let ok: GeoPoint = serde_json::from_str(r#"{"latitude":13.75,"longitude":100.5}"#).unwrap();
        assert_eq!(ok, GeoPoint::new_unchecked(13.75, 100.5));

        let err = serde_json::from_str::<GeoPoint>(r#"{"latitude":500.0,"longitude":100.5}"#).unwrap_err();
        assert!(err.to_string().contains("latitude"), "{err}");
        assert!(serde_json::from_str::<GeoPoint>(r#"{"latitude":0.0,"longitude":-181.0}"#).is_err());
    }

    #[test]
    fn validated_constructor() {
        assert!(GeoPoint::new(13.75, 100.5).is_ok());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }
}
