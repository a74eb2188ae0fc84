//! 시/도별 공고 수 / 회사 수 집계
//!
//! 같은 공고 ID는 한 번만 센다. ID가 없는 공고는 볼 때마다 센다.
//! 단일 writer 전제: `add`는 `&mut self`를 요구하며 내부 동기화는 없다.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::job::NormalizedJob;

/// 집계 결과 한 행
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCount {
    pub region: String,
    pub job_count: usize,
    pub company_count: usize,
}

#[derive(Debug, Default)]
struct RegionStats {
    job_ids: HashSet<String>,
    anonymous_jobs: usize,
    companies: HashSet<String>,
}

impl RegionStats {
    fn job_count(&self) -> usize {
        self.anonymous_jobs + self.job_ids.len()
    }
}

#[derive(Debug, Default)]
pub struct RegionAggregator {
    regions: BTreeMap<String, RegionStats>,
}

impl RegionAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, job: &NormalizedJob) {
        let region = job.region.trim();
        if region.is_empty() {
            return;
        }

        let stats = self.regions.entry(region.to_string()).or_default();
        if job.source_job_id.is_empty() {
            stats.anonymous_jobs += 1;
        } else {
            stats.job_ids.insert(job.source_job_id.clone());
        }
        if !job.company_name.is_empty() {
            stats.companies.insert(job.company_name.clone());
        }
    }

    /// Rows sorted by region name
    #[must_use]
    pub fn results(&self) -> Vec<RegionCount> {
        self.regions
            .iter()
            .map(|(region, stats)| RegionCount {
                region: region.clone(),
                job_count: stats.job_count(),
                company_count: stats.companies.len(),
            })
            .collect()
    }

    /// Consume the aggregator and return its rows
    #[must_use]
    pub fn into_results(self) -> Vec<RegionCount> {
        self.results()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
