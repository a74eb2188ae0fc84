//! 지역(시/도) 판별 규칙
//!
//! Responsibility:
//! - 계층형 근무지 문자열("서울 > 강남구", "경기 성남시/분당구")에서 최상위 시/도 추출
//! - 재택/전국/해외 등 특정 지역으로 볼 수 없는 토큰 제외
//! - 지오코딩 질의 문자열 생성
//! - 시/도 중심 좌표 테이블 (회사 좌표 fallback)

use std::collections::HashMap;

use super::job::Coordinates;

/// (prefix, canonical) 쌍. 같은 접두사를 공유하는 경우 더 긴 표기가 먼저 와야 한다.
const REGION_ALIASES: &[(&str, &str)] = &[
    ("서울특별시", "서울"),
    ("서울시", "서울"),
    ("서울", "서울"),
    ("부산광역시", "부산"),
    ("부산시", "부산"),
    ("부산", "부산"),
    ("대구광역시", "대구"),
    ("대구시", "대구"),
    ("대구", "대구"),
    ("인천광역시", "인천"),
    ("인천시", "인천"),
    ("인천", "인천"),
    ("광주광역시", "광주"),
    ("광주시", "광주"),
    ("광주", "광주"),
    ("대전광역시", "대전"),
    ("대전시", "대전"),
    ("대전", "대전"),
    ("울산광역시", "울산"),
    ("울산시", "울산"),
    ("울산", "울산"),
    ("세종특별자치시", "세종"),
    ("세종시", "세종"),
    ("세종", "세종"),
    ("경기도", "경기"),
    ("경기", "경기"),
    ("강원특별자치도", "강원"),
    ("강원도", "강원"),
    ("강원", "강원"),
    ("충청북도", "충북"),
    ("충북", "충북"),
    ("충청남도", "충남"),
    ("충남", "충남"),
    ("전라북도", "전북"),
    ("전북", "전북"),
    ("전라남도", "전남"),
    ("전남", "전남"),
    ("경상북도", "경북"),
    ("경북", "경북"),
    ("경상남도", "경남"),
    ("경남", "경남"),
    ("제주특별자치도", "제주"),
    ("제주도", "제주"),
    ("제주", "제주"),
];

/// Segments containing any of these never map to a single region
const NON_REGION_KEYWORDS: &[&str] = &["전국", "재택", "원격", "해외"];

/// Location names containing any of these are not worth geocoding
const REMOTE_KEYWORDS: &[&str] = &["전국", "재택", "원격", "리모트", "remote", "해외"];

/// Extract the canonical region from ordered location names.
///
/// The first location name that yields a region wins; an empty string means no match.
#[must_use]
pub fn extract_region<S: AsRef<str>>(location_names: &[S]) -> String {
    location_names
        .iter()
        .map(|name| extract_region_from_name(name.as_ref()))
        .find(|region| !region.is_empty())
        .unwrap_or_default()
}

/// 단일 근무지 문자열에서 시/도 추출
#[must_use]
pub fn extract_region_from_name(name: &str) -> String {
    for segment in name.trim().split(',') {
        let mut candidate = segment.trim();
        if let Some(idx) = candidate.find('>') {
            candidate = &candidate[..idx];
        }
        if let Some(idx) = candidate.find('/') {
            candidate = &candidate[..idx];
        }
        let Some(head) = candidate.split_whitespace().next() else {
            continue;
        };
        if let Some(region) = normalize_region_name(head) {
            return region.to_string();
        }
    }
    String::new()
}

/// 단어 하나를 canonical 시/도 이름으로 변환 (괄호 접미사 제거 후 alias 매칭)
#[must_use]
pub fn normalize_region_name(value: &str) -> Option<&'static str> {
    let mut trimmed = value.trim();
    if let Some(idx) = trimmed.find('(') {
        trimmed = trimmed[..idx].trim();
    }
    if trimmed.is_empty() {
        return None;
    }
    if NON_REGION_KEYWORDS.iter().any(|kw| trimmed.contains(kw)) {
        return None;
    }
    REGION_ALIASES
        .iter()
        .find(|(prefix, _)| trimmed.starts_with(prefix))
        .map(|(_, canonical)| *canonical)
}

/// Case-insensitive remote/nationwide/overseas check
#[must_use]
pub fn contains_remote_keyword(value: &str) -> bool {
    let lower = value.to_lowercase();
    REMOTE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// 지오코딩 질의 생성: 원격 근무가 아닌 첫 근무지를 공백 구분 문자열로 평탄화
#[must_use]
pub fn build_geo_query<S: AsRef<str>>(location_names: &[S]) -> String {
    for name in location_names {
        let candidate = name.as_ref().trim();
        if candidate.is_empty() || contains_remote_keyword(candidate) {
            continue;
        }
        let flattened = candidate
            .replace(['>', '/', ','], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !flattened.is_empty() {
            return flattened;
        }
    }
    String::new()
}

/// Static fallback coordinates per region.
///
/// Passed into the company aggregator explicitly so tests can swap the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionCentroids {
    centroids: HashMap<String, Coordinates>,
}

impl RegionCentroids {
    #[must_use]
    pub fn new(centroids: HashMap<String, Coordinates>) -> Self {
        Self { centroids }
    }

    /// 17개 시/도 중심 좌표
    #[must_use]
    pub fn korea() -> Self {
        let table = [
            ("서울", 37.5665, 126.9780),
            ("부산", 35.1796, 129.0756),
            ("대구", 35.8722, 128.6025),
            ("인천", 37.4563, 126.7052),
            ("광주", 35.1595, 126.8526),
            ("대전", 36.3504, 127.3845),
            ("울산", 35.5384, 129.3114),
            ("세종", 36.4801, 127.2890),
            ("경기", 37.4138, 127.5183),
            ("강원", 37.8228, 128.1555),
            ("충북", 36.6358, 127.4914),
            ("충남", 36.5184, 126.8000),
            ("전북", 35.8202, 127.1088),
            ("전남", 34.8161, 126.4629),
            ("경북", 36.5760, 128.5056),
            ("경남", 35.4606, 128.2132),
            ("제주", 33.4996, 126.5312),
        ];
        Self::new(
            table
                .into_iter()
                .map(|(region, lat, lng)| (region.to_string(), Coordinates::new(lat, lng)))
                .collect(),
        )
    }

    /// Centroid for `region`, or unset coordinates when the region is unknown
    #[must_use]
    pub fn get(&self, region: &str) -> Coordinates {
        self.centroids.get(region).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }
}
