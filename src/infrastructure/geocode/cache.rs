//! 지오코딩 결과 영속 캐시
//!
//! 키는 정규화된 질의 (trim + 소문자). "찾지 못함" 결과도 저장해 같은 질의를 다시 보내지 않는다.
//! 단일 writer: `set`은 `&mut self`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::Coordinates;
use crate::infrastructure::errors::StoreError;
use crate::infrastructure::json_file::{load_json_or_default, null_as_default, save_json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoCacheEntry {
    /// Query text as the caller sent it
    #[serde(default, deserialize_with = "null_as_default")]
    pub query: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lat: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lng: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub found: bool,
    /// Absent or null reads as the unix epoch
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: DateTime<Utc>,
}

impl GeoCacheEntry {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoCache {
    #[serde(default, deserialize_with = "null_as_default")]
    entries: BTreeMap<String, GeoCacheEntry>,
}

impl GeoCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing file starts empty; malformed file is an error
    pub async fn load(path: &Path) -> Result<Self, StoreError> {
        load_json_or_default(path).await
    }

    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self).await
    }

    #[must_use]
    pub fn get(&self, query: &str) -> Option<&GeoCacheEntry> {
        self.entries.get(&normalize_query(query))
    }

    /// Insert under the normalized key, keeping `query` as the entry's text
    pub fn set(&mut self, query: &str, mut entry: GeoCacheEntry) {
        entry.query = query.to_string();
        self.entries.insert(normalize_query(query), entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}
