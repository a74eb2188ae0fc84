//! # Job Entities
//!
//! 수집 파이프라인 전반에서 사용하는 정규화된 채용 공고 모델.
//! 외부 API의 느슨한 타입(문자열/숫자 혼용)은 infrastructure 경계에서 이미 정리된 상태로 들어온다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source label for listings coming from the Saramin job-search API
pub const SOURCE_SARAMIN: &str = "saramin";

/// 위경도 좌표. (0, 0)은 "미설정"으로 취급한다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when neither component carries a value
    #[must_use]
    pub fn is_unset(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// 정규화된 채용 공고
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedJob {
    pub source: String,
    pub source_job_id: String,
    pub source_url: String,
    pub company_name: String,
    pub company_url: String,
    pub title: String,
    pub job_mid_code: String,
    pub job_code: String,
    pub job_type_code: String,
    pub location_codes: Vec<String>,
    pub location_names: Vec<String>,
    /// Canonical 시/도 name, empty when no location token matched
    pub region: String,
    pub keywords: Vec<String>,
    pub active: bool,
    pub coordinates: Coordinates,
    pub posted_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl NormalizedJob {
    /// Latest known activity timestamp among updated/posted/observed
    #[must_use]
    pub fn latest_activity(&self) -> Option<DateTime<Utc>> {
        [self.updated_at, self.posted_at, self.observed_at]
            .into_iter()
            .flatten()
            .max()
    }

    #[must_use]
    pub fn has_region(&self) -> bool {
        !self.region.trim().is_empty()
    }
}

/// 원본 공고 보관용 레코드 (append-only archive)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJob {
    pub source: String,
    pub source_job_id: String,
    pub fetched_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}
