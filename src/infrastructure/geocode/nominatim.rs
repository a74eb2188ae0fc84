//! Nominatim 검색 API 기반 지오코더
//!
//! 공개 Nominatim 사용 정책상 초당 1회 이하로 요청하고 User-Agent 를 반드시 보낸다.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::{GeocodeResult, Geocoder};
use crate::infrastructure::errors::GeocodeError;
use crate::infrastructure::rate_gate::RateGate;

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
pub const DEFAULT_USER_AGENT: &str = "devatlas-geocoder/0.1";

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    pub user_agent: String,
    pub min_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    lat: String,
    #[serde(default)]
    lon: String,
}

#[derive(Debug)]
pub struct NominatimGeocoder {
    http: Client,
    search_endpoint: Url,
    gate: RateGate,
}

impl NominatimGeocoder {
    pub fn new(config: NominatimConfig) -> Result<Self, GeocodeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(agent) = HeaderValue::from_str(config.user_agent.trim()) {
            if !agent.is_empty() {
                headers.insert(USER_AGENT, agent);
            }
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        let base_url = if config.base_url.trim().is_empty() {
            DEFAULT_NOMINATIM_URL
        } else {
            config.base_url.trim()
        };
        let joined = format!("{}/search", base_url.trim_end_matches('/'));
        let search_endpoint = Url::parse(&joined).map_err(|e| GeocodeError::InvalidUrl {
            url: joined.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            http,
            search_endpoint,
            gate: RateGate::new(config.min_interval),
        })
    }

    fn search_url(&self, query: &str) -> Url {
        let mut url = self.search_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("limit", "1")
            .append_pair("q", query);
        url
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<GeocodeResult, GeocodeError> {
        if query.trim().is_empty() {
            return Ok(GeocodeResult::not_found());
        }
        self.gate
            .wait(cancel)
            .await
            .map_err(|_| GeocodeError::Cancelled)?;

        let url = self.search_url(query);
        debug!(query, "🗺️ nominatim search");

        let exchange = async {
            let response = self.http.get(url).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };
        let (status, body) = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(GeocodeError::Cancelled),
            result = exchange => result?,
        };

        if status != 200 {
            return Err(GeocodeError::HttpStatus { status });
        }

        let hits: Vec<SearchHit> = serde_json::from_str(&body)?;
        let Some(hit) = hits.first() else {
            return Ok(GeocodeResult::not_found());
        };
        Ok(GeocodeResult::found(parse_coordinate(&hit.lat)?, parse_coordinate(&hit.lon)?))
    }
}

fn parse_coordinate(value: &str) -> Result<f64, GeocodeError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| GeocodeError::InvalidCoordinate {
            value: value.to_string(),
        })
}
