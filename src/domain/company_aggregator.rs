//! 활성 회사 목록 집계
//!
//! (회사명, 시/도) 당 하나의 레코드를 유지한다.
//! - `last_seen`은 감소하지 않는다
//! - 좌표는 한 번 채워지면 덮어쓰지 않는다
//!
//! 단일 writer 전제: `add`는 `&mut self`를 요구하며 내부 동기화는 없다.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::{Coordinates, NormalizedJob};
use super::region::RegionCentroids;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub name: String,
    pub region: String,
    pub lat: f64,
    pub lng: f64,
    pub url: String,
    pub last_seen: DateTime<Utc>,
}

impl CompanyRecord {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

#[derive(Debug)]
pub struct CompanyAggregator {
    centroids: RegionCentroids,
    records: HashMap<(String, String), CompanyRecord>,
}

impl CompanyAggregator {
    #[must_use]
    pub fn new(centroids: RegionCentroids) -> Self {
        Self {
            centroids,
            records: HashMap::new(),
        }
    }

    /// Record a sighting of the job's company. `now` is used when the job carries no timestamp.
    pub fn add(&mut self, job: &NormalizedJob, now: DateTime<Utc>) {
        let name = job.company_name.as_str();
        let region = job.region.trim();
        if name.is_empty() || region.is_empty() {
            return;
        }

        let seen = job.latest_activity().unwrap_or(now);
        let url = if job.company_url.is_empty() {
            job.source_url.as_str()
        } else {
            job.company_url.as_str()
        };

        let key = (name.to_string(), region.to_string());
        match self.records.get_mut(&key) {
            Some(existing) => {
                if seen > existing.last_seen {
                    existing.last_seen = seen;
                    if !url.is_empty() {
                        existing.url = url.to_string();
                    }
                }
                if existing.coordinates().is_unset() && !job.coordinates.is_unset() {
                    existing.lat = job.coordinates.lat;
                    existing.lng = job.coordinates.lng;
                }
            }
            None => {
                let coords = if job.coordinates.is_unset() {
                    self.centroids.get(region)
                } else {
                    job.coordinates
                };
                self.records.insert(
                    key,
                    CompanyRecord {
                        name: name.to_string(),
                        region: region.to_string(),
                        lat: coords.lat,
                        lng: coords.lng,
                        url: url.to_string(),
                        last_seen: seen,
                    },
                );
            }
        }
    }

    /// Records seen at or after `cutoff`, sorted by (region, name)
    #[must_use]
    pub fn active_companies(&self, cutoff: DateTime<Utc>) -> Vec<CompanyRecord> {
        let mut active: Vec<CompanyRecord> = self
            .records
            .values()
            .filter(|record| record.last_seen >= cutoff)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.region.cmp(&b.region).then_with(|| a.name.cmp(&b.name)));
        active
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
