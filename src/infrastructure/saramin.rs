//! Saramin job-search API 연동
//!
//! - `types`: 응답 타입 (`StringOrNumber` 경계 어댑터 포함)
//! - `client`: 요청 인코딩, 레이트 게이트, 재시도
//! - `pager`: 페이지 순회
//! - `normalizer`: 응답 → 도메인 모델

pub mod client;
pub mod normalizer;
pub mod pager;
pub mod types;

pub use client::{DEFAULT_BASE_URL, JobSearchParams, SaraminClient, SaraminClientConfig};
pub use normalizer::{normalize_saramin_job, split_csv};
pub use pager::{DEFAULT_PAGE_SIZE, PageHandler};
pub use types::{Job, JobSearchResponse, StringOrNumber};
