//! 캐시 우선 지오코딩 해석기
//!
//! 캐시에 있으면 외부 호출 없이 반환하고, 없으면 지오코더를 호출한 뒤 결과를 (찾지 못한 경우 포함)
//! 캐시에 기록한다.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::cache::{GeoCache, GeoCacheEntry};
use super::{GeocodeResult, Geocoder};
use crate::domain::job::Coordinates;
use crate::infrastructure::errors::GeocodeError;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Resolution {
    pub coords: Coordinates,
    pub found: bool,
    pub cache_hit: bool,
}

pub struct GeoResolver {
    geocoder: Option<Arc<dyn Geocoder>>,
    cache: GeoCache,
    hits: usize,
    misses: usize,
}

impl GeoResolver {
    #[must_use]
    pub fn new(geocoder: Option<Arc<dyn Geocoder>>, cache: GeoCache) -> Self {
        Self {
            geocoder,
            cache,
            hits: 0,
            misses: 0,
        }
    }

    pub async fn resolve(
        &mut self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Resolution, GeocodeError> {
        let Some(geocoder) = &self.geocoder else {
            return Ok(Resolution::default());
        };
        if query.trim().is_empty() {
            return Ok(Resolution::default());
        }

        if let Some(entry) = self.cache.get(query) {
            self.hits += 1;
            trace!(query, found = entry.found, "geocode cache hit");
            return Ok(Resolution {
                coords: entry.coordinates(),
                found: entry.found,
                cache_hit: true,
            });
        }

        let GeocodeResult { coordinates, found } = geocoder.geocode(query, cancel).await?;
        self.misses += 1;
        self.cache.set(
            query,
            GeoCacheEntry {
                query: query.to_string(),
                lat: coordinates.lat,
                lng: coordinates.lng,
                found,
                updated_at: Utc::now(),
            },
        );
        Ok(Resolution {
            coords: coordinates,
            found,
            cache_hit: false,
        })
    }

    #[must_use]
    pub fn cache(&self) -> &GeoCache {
        &self.cache
    }

    #[must_use]
    pub fn into_cache(self) -> GeoCache {
        self.cache
    }

    /// (cache hits, geocoder calls)
    #[must_use]
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }
}

impl std::fmt::Debug for GeoResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoResolver")
            .field("has_geocoder", &self.geocoder.is_some())
            .field("cache_entries", &self.cache.len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGeocoder {
        calls: Arc<AtomicUsize>,
        result: GeocodeResult,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn geocode(
            &self,
            _query: &str,
            _cancel: &CancellationToken,
        ) -> Result<GeocodeResult, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result)
        }
    }

    struct FailingGeocoder;

    #[async_trait]
    impl Geocoder for FailingGeocoder {
        async fn geocode(
            &self,
            _query: &str,
            _cancel: &CancellationToken,
        ) -> Result<GeocodeResult, GeocodeError> {
            Err(GeocodeError::HttpStatus { status: 503 })
        }
    }

    fn counting(result: GeocodeResult) -> (Arc<dyn Geocoder>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(CountingGeocoder {
                calls: Arc::clone(&calls),
                result,
            }),
            calls,
        )
    }

    #[tokio::test]
    async fn test_cache_hit_skips_geocoder() {
        let (geocoder, calls) = counting(GeocodeResult::found(37.5, 127.0));
        let mut resolver = GeoResolver::new(Some(geocoder), GeoCache::new());
        let cancel = CancellationToken::new();

        let first = resolver.resolve("서울 강남구", &cancel).await.unwrap();
        assert!(!first.cache_hit);
        assert!(first.found);

        let second = resolver.resolve("  서울 강남구 ", &cancel).await.unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.coords, Coordinates::new(37.5, 127.0));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.stats(), (1, 1));
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let (geocoder, calls) = counting(GeocodeResult::not_found());
        let mut resolver = GeoResolver::new(Some(geocoder), GeoCache::new());
        let cancel = CancellationToken::new();

        assert!(!resolver.resolve("어딘가", &cancel).await.unwrap().found);
        let again = resolver.resolve("어딘가", &cancel).await.unwrap();
        assert!(again.cache_hit);
        assert!(!again.found);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let cache = resolver.into_cache();
        assert_eq!(cache.get("어딘가").unwrap().query, "어딘가");
    }

    #[tokio::test]
    async fn test_empty_query_or_no_geocoder_leaves_cache_untouched() {
        let (geocoder, calls) = counting(GeocodeResult::found(1.0, 1.0));
        let mut resolver = GeoResolver::new(Some(geocoder), GeoCache::new());
        let cancel = CancellationToken::new();
        let result = resolver.resolve("   ", &cancel).await.unwrap();
        assert_eq!(result, Resolution::default());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(resolver.cache().is_empty());

        let mut without = GeoResolver::new(None, GeoCache::new());
        assert!(!without.resolve("서울", &cancel).await.unwrap().found);
        assert!(without.cache().is_empty());
    }

    #[tokio::test]
    async fn test_geocoder_error_propagates_without_caching() {
        let mut resolver = GeoResolver::new(Some(Arc::new(FailingGeocoder)), GeoCache::new());
        let err = resolver
            .resolve("서울", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GeocodeError::HttpStatus { status: 503 }));
        assert!(resolver.cache().is_empty());
    }
}
