//! 실행 결과 파일 작성
//!
//! - `region_counts.json`: 시/도별 공고 수, 회사 수
//! - `latest_companies.json`: 활성 회사 목록 (asof 는 KST 날짜)
//! - `region_missing.jsonl`: 시/도를 판별하지 못한 공고 (append)

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::errors::StoreError;
use super::json_file::{append_jsonl, save_json};
use crate::domain::company_aggregator::CompanyRecord;
use crate::domain::region_aggregator::RegionCount;
use crate::domain::window::FetchWindow;
use crate::utils::kst_date;

pub const REGION_LEVEL_SIDO: &str = "sido";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCountsMeta {
    pub run_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub missing_regions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCountsReport {
    pub meta: RegionCountsMeta,
    pub regions: Vec<RegionCount>,
}

impl RegionCountsReport {
    #[must_use]
    pub fn new(
        run_at: DateTime<Utc>,
        window: FetchWindow,
        missing_regions: usize,
        regions: Vec<RegionCount>,
    ) -> Self {
        Self {
            meta: RegionCountsMeta {
                run_at,
                window_start: window.start,
                window_end: window.end,
                missing_regions,
            },
            regions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestCompaniesMeta {
    pub run_at: DateTime<Utc>,
    pub region_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestCompany {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub region: String,
    pub url: String,
    /// `YYYY-MM-DD` (KST) of the last sighting
    pub asof: String,
}

impl From<&CompanyRecord> for LatestCompany {
    fn from(record: &CompanyRecord) -> Self {
        Self {
            name: record.name.clone(),
            lat: record.lat,
            lng: record.lng,
            region: record.region.clone(),
            url: record.url.clone(),
            asof: kst_date(&record.last_seen),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestCompaniesReport {
    pub meta: LatestCompaniesMeta,
    pub companies: Vec<LatestCompany>,
}

impl LatestCompaniesReport {
    #[must_use]
    pub fn new(run_at: DateTime<Utc>, companies: &[CompanyRecord]) -> Self {
        Self {
            meta: LatestCompaniesMeta {
                run_at,
                region_level: REGION_LEVEL_SIDO.to_string(),
            },
            companies: companies.iter().map(LatestCompany::from).collect(),
        }
    }
}

/// A job whose location did not map to any region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionIssue {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub company: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub location_codes: Vec<String>,
    pub observed_at: DateTime<Utc>,
}

pub async fn write_region_counts(path: &Path, report: &RegionCountsReport) -> Result<(), StoreError> {
    save_json(path, report).await?;
    info!(path = %path.display(), regions = report.regions.len(), "💾 region counts written");
    Ok(())
}

pub async fn write_latest_companies(
    path: &Path,
    report: &LatestCompaniesReport,
) -> Result<(), StoreError> {
    save_json(path, report).await?;
    info!(path = %path.display(), companies = report.companies.len(), "💾 latest companies written");
    Ok(())
}

pub async fn append_region_issues(path: &Path, issues: &[RegionIssue]) -> Result<(), StoreError> {
    append_jsonl(path, issues).await?;
    if !issues.is_empty() {
        info!(path = %path.display(), issues = issues.len(), "⚠️ region issues appended");
    }
    Ok(())
}
