//! 공통 유틸리티 함수들
//!
//! 한국 표준시(KST, UTC+9) 변환. 파일 이름의 날짜 키, run id, `asof` 날짜가 모두 KST 기준이다.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};

const KST_OFFSET_SECS: i32 = 9 * 3600;

/// UTC+9
#[must_use]
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

#[must_use]
pub fn to_kst<Tz: TimeZone>(time: &DateTime<Tz>) -> DateTime<FixedOffset> {
    time.with_timezone(&kst())
}

/// `YYYYMMDD` in KST
#[must_use]
pub fn kst_date_key(time: &DateTime<Utc>) -> String {
    to_kst(time).format("%Y%m%d").to_string()
}

/// `YYYY-MM-DD` in KST
#[must_use]
pub fn kst_date(time: &DateTime<Utc>) -> String {
    to_kst(time).format("%Y-%m-%d").to_string()
}
