//! 마지막 자동 실행 시각 저장소 (`run_state.json`)

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::StoreError;
use super::json_file::{load_json_or_default, save_json};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
}

impl RunState {
    /// Persisted timestamp, ignoring zero-valued placeholders at or before the unix epoch
    #[must_use]
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run_at.filter(|t| t.timestamp() > 0)
    }
}

#[derive(Debug, Clone)]
pub struct RunStateStore {
    path: PathBuf,
}

impl RunStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<RunState, StoreError> {
        let state: RunState = load_json_or_default(&self.path).await?;
        debug!(path = %self.path.display(), last_run_at = ?state.last_run_at, "run state loaded");
        Ok(state)
    }

    pub async fn save(&self, state: &RunState) -> Result<(), StoreError> {
        save_json(&self.path, state).await
    }
}
