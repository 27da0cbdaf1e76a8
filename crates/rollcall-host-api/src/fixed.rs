//! Location provider backed by a fixed coordinate

use async_trait::async_trait;
use rollcall_util::GeoPoint;

use crate::{LocationError, LocationProvider, LocationRequest, LocationResult};

/// Reports a position supplied up front (e.g. from the command line).
/// Without one, every request fails as unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLocation {
    position: Option<GeoPoint>,
}

impl StaticLocation {
    pub fn new(position: GeoPoint) -> Self {
        Self {
            position: Some(position),
        }
    }

    pub fn unavailable() -> Self {
        Self { position: None }
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn current_position(&self, _request: LocationRequest) -> LocationResult<GeoPoint> {
        self.position.ok_or(LocationError::Unsupported)
    }
}
