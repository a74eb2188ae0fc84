//! Saramin 공고 → `NormalizedJob` 변환

use chrono::{DateTime, Utc};

use super::types::Job;
use crate::domain::job::{Coordinates, NormalizedJob, SOURCE_SARAMIN};
use crate::domain::region::extract_region;

/// Pure conversion; a missing `observed_at` becomes `now`.
#[must_use]
pub fn normalize_saramin_job(job: &Job, observed_at: Option<DateTime<Utc>>) -> NormalizedJob {
    let location_codes = split_csv(job.position.location.code.as_str());
    let location_names = split_csv(&job.position.location.name);
    let region = extract_region(&location_names);

    NormalizedJob {
        source: SOURCE_SARAMIN.to_string(),
        source_job_id: job.id.trim().to_string(),
        source_url: job.url.clone(),
        company_name: job.company.detail.name.clone(),
        company_url: job.company.detail.href.clone(),
        title: job.position.title.clone(),
        job_mid_code: job.position.job_mid_code.code.to_string(),
        job_code: job.position.job_code.code.to_string(),
        job_type_code: job.position.job_type.code.to_string(),
        location_codes,
        location_names,
        region,
        keywords: split_csv(&job.keyword),
        active: job.active.as_str().trim() == "1",
        coordinates: Coordinates::default(),
        posted_at: job.posting_timestamp.as_unix_time(),
        updated_at: job.modification_timestamp.as_unix_time(),
        expires_at: job.expiration_timestamp.as_unix_time(),
        observed_at: Some(observed_at.unwrap_or_else(Utc::now)),
    }
}

/// Comma split with trimmed, non-empty parts
#[must_use]
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}
