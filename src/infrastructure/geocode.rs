//! 지오코딩
//!
//! - `cache`: 질의 → 좌표 영속 캐시
//! - `nominatim`: OpenStreetMap Nominatim 클라이언트
//! - `resolver`: 캐시 우선 해석

pub mod cache;
pub mod nominatim;
pub mod resolver;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::job::Coordinates;
use crate::infrastructure::errors::GeocodeError;

pub use cache::{GeoCache, GeoCacheEntry};
pub use nominatim::{NominatimConfig, NominatimGeocoder};
pub use resolver::{GeoResolver, Resolution};

/// Outcome of a single geocoding lookup. "Not found" is a result, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeocodeResult {
    pub coordinates: Coordinates,
    pub found: bool,
}

impl GeocodeResult {
    #[must_use]
    pub fn found(lat: f64, lng: f64) -> Self {
        Self {
            coordinates: Coordinates::new(lat, lng),
            found: true,
        }
    }

    #[must_use]
    pub fn not_found() -> Self {
        Self::default()
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<GeocodeResult, GeocodeError>;
}
