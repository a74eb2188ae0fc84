//! 외부 경계별 에러 타입
//!
//! - `SaraminError`: 채용 공고 API
//! - `GeocodeError`: 지오코더
//! - `StoreError`: 로컬 JSON/JSONL 파일

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaraminError {
    #[error("saramin access key is required")]
    MissingAccessKey,

    /// The API reported a non-zero result code
    #[error("saramin api error (status {status}, code {code}): {message}")]
    Api { code: i64, message: String, status: u16 },

    #[error("saramin http status {status}")]
    HttpStatus { status: u16 },

    #[error("saramin request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode saramin response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid saramin url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("saramin request cancelled")]
    Cancelled,
}

impl SaraminError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocode request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("geocode http status {status}")]
    HttpStatus { status: u16 },

    #[error("failed to decode geocode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid coordinate '{value}' in geocode response")]
    InvalidCoordinate { value: String },

    #[error("invalid geocoder url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("geocode request cancelled")]
    Cancelled,
}

impl GeocodeError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }
}
