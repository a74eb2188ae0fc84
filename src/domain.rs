//! Domain module - 채용 공고 수집/집계의 핵심 규칙
//!
//! 외부 I/O 없이 순수한 로직만 둔다:
//! - 정규화된 공고 모델 (`job`)
//! - 시/도 판별과 중심 좌표 (`region`)
//! - 수집 윈도우 계획 (`window`)
//! - 시/도별 카운트, 활성 회사 집계 (`region_aggregator`, `company_aggregator`)

pub mod company_aggregator;
pub mod job;
pub mod region;
pub mod region_aggregator;
pub mod window;

pub use company_aggregator::{CompanyAggregator, CompanyRecord};
pub use job::{Coordinates, NormalizedJob, RawJob, SOURCE_SARAMIN};
pub use region::{RegionCentroids, build_geo_query, extract_region};
pub use region_aggregator::{RegionAggregator, RegionCount};
pub use window::{ExplicitBounds, FetchWindow, WindowPlan, WindowPlanner};
