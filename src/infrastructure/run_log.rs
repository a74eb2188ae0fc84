//! 실행 기록 (`runs/run-<id>.json`)
//!
//! 시작 시 한 번 (`started`), 종료 시 한 번 (`completed` / `failed`) 같은 파일을 덮어쓴다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::StoreError;
use super::json_file::save_json;
use crate::domain::window::FetchWindow;
use crate::utils::to_kst;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Started,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub pages: u64,
    pub jobs: u64,
    pub missing_regions: u64,
    pub geocode_hits: u64,
    pub geocode_misses: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub run_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metrics: RunMetrics,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// `%Y%m%dT%H%M%S%z` in KST
#[must_use]
pub fn run_id(run_at: &DateTime<Utc>) -> String {
    to_kst(run_at).format("%Y%m%dT%H%M%S%z").to_string()
}

#[derive(Debug, Clone)]
pub struct RunLog {
    dir: PathBuf,
}

impl RunLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("run-{id}.json"))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn start(
        &self,
        run_at: DateTime<Utc>,
        window: FetchWindow,
        tags: BTreeMap<String, String>,
    ) -> Result<RunRecord, StoreError> {
        let record = RunRecord {
            id: run_id(&run_at),
            run_at,
            window_start: window.start,
            window_end: window.end,
            started_at: Utc::now(),
            completed_at: None,
            status: RunStatus::Started,
            error: None,
            metrics: RunMetrics::default(),
            tags,
        };
        self.write(&record).await?;
        Ok(record)
    }

    /// Mark the record completed (`error == None`) or failed and rewrite it
    pub async fn finish(
        &self,
        record: &mut RunRecord,
        metrics: RunMetrics,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        record.completed_at = Some(Utc::now());
        record.metrics = metrics;
        record.status = if error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        record.error = error;
        self.write(record).await
    }

    async fn write(&self, record: &RunRecord) -> Result<(), StoreError> {
        let path = self.record_path(&record.id);
        debug!(path = %path.display(), status = ?record.status, "📝 run log written");
        save_json(&path, record).await
    }
}
