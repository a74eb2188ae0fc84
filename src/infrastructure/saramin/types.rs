//! Saramin job-search 응답 타입
//!
//! API 는 같은 필드를 문자열/숫자/null 로 섞어 보내므로 경계에서 `StringOrNumber` 로 받는다.
//! 도메인 모델로 변환된 뒤에는 느슨한 타입이 남지 않는다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::infrastructure::json_file::null_as_default;

/// Accepts a JSON string, number or null. Null and absent values are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StringOrNumber(pub String);

impl StringOrNumber {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Unix seconds to UTC; empty or malformed values yield `None`
    #[must_use]
    pub fn as_unix_time(&self) -> Option<DateTime<Utc>> {
        let secs = self.0.trim().parse::<i64>().ok()?;
        DateTime::from_timestamp(secs, 0)
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

impl From<&str> for StringOrNumber {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for StringOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for StringOrNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StringOrNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StringOrNumberVisitor;

        impl<'v> de::Visitor<'v> for StringOrNumberVisitor {
            type Value = StringOrNumber;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, a number or null")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(StringOrNumber(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(StringOrNumber(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(StringOrNumber::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(StringOrNumber::default())
            }

            fn visit_some<D2: Deserializer<'v>>(self, d: D2) -> Result<Self::Value, D2::Error> {
                d.deserialize_any(self)
            }
        }

        deserializer.deserialize_any(StringOrNumberVisitor)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSearchResponse {
    #[serde(default)]
    pub jobs: JobSearchJobs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// `jobs.job` entries exactly as received, for archiving
    #[serde(skip)]
    pub raw_jobs: Vec<serde_json::Value>,
}

impl JobSearchResponse {
    /// Decode a response body, keeping the untyped listings next to the typed ones
    pub fn from_json(body: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        let raw_jobs = value
            .pointer("/jobs/job")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();
        let mut response: Self = serde_json::from_value(value)?;
        response.raw_jobs = raw_jobs;
        Ok(response)
    }

    /// Untyped listing at `index`, when the body carried one
    #[must_use]
    pub fn raw_job(&self, index: usize) -> Option<&serde_json::Value> {
        self.raw_jobs.get(index)
    }

    /// Non-zero result code reported inside an otherwise successful response
    #[must_use]
    pub fn error_code(&self) -> Option<i64> {
        self.code.filter(|code| *code != 0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSearchJobs {
    #[serde(default)]
    pub count: StringOrNumber,
    #[serde(default)]
    pub start: StringOrNumber,
    /// 전체 건수. 문자열로 온다
    #[serde(default)]
    pub total: StringOrNumber,
    #[serde(default, deserialize_with = "null_as_default")]
    pub job: Vec<Job>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Job {
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    pub active: StringOrNumber,
    #[serde(deserialize_with = "null_as_default")]
    pub company: Company,
    #[serde(deserialize_with = "null_as_default")]
    pub position: Position,
    #[serde(deserialize_with = "null_as_default")]
    pub keyword: String,
    #[serde(deserialize_with = "null_as_default")]
    pub salary: CodeName,
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    pub posting_timestamp: StringOrNumber,
    #[serde(deserialize_with = "null_as_default")]
    pub posting_date: String,
    pub modification_timestamp: StringOrNumber,
    pub opening_timestamp: StringOrNumber,
    pub expiration_timestamp: StringOrNumber,
    #[serde(deserialize_with = "null_as_default")]
    pub expiration_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub close_type: CodeName,
    pub read_cnt: StringOrNumber,
    pub apply_cnt: StringOrNumber,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    #[serde(deserialize_with = "null_as_default")]
    pub detail: CompanyDetail,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyDetail {
    #[serde(deserialize_with = "null_as_default")]
    pub href: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Position {
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub industry: CodeName,
    #[serde(deserialize_with = "null_as_default")]
    pub location: CodeName,
    #[serde(deserialize_with = "null_as_default")]
    pub job_type: CodeName,
    #[serde(deserialize_with = "null_as_default")]
    pub job_mid_code: CodeName,
    #[serde(deserialize_with = "null_as_default")]
    pub job_code: CodeName,
    #[serde(deserialize_with = "null_as_default")]
    pub experience_level: Experience,
    #[serde(deserialize_with = "null_as_default")]
    pub required_education_level: CodeName,
    #[serde(deserialize_with = "null_as_default")]
    pub industry_keyword_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub job_code_keyword_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeName {
    pub code: StringOrNumber,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub code: StringOrNumber,
    pub min: StringOrNumber,
    pub max: StringOrNumber,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

/// Error body returned with non-200 responses
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_or_number_variants() {
        let values: Vec<StringOrNumber> =
            serde_json::from_str(r#"["1700000000", 1700000000, null, 1.5, ""]"#).unwrap();
        assert_eq!(values[0].as_str(), "1700000000");
        assert_eq!(values[1].as_str(), "1700000000");
        assert!(values[2].is_empty());
        assert_eq!(values[3].as_str(), "1.5");
        assert!(values[4].as_unix_time().is_none());
        assert_eq!(
            values[1].as_unix_time(),
            DateTime::from_timestamp(1_700_000_000, 0)
        );
    }

    #[test]
    fn test_decode_job_search_response() {
        let body = r#"{
            "jobs": {
                "count": 1, "start": 0, "total": "57",
                "job": [{
                    "url": "https://www.saramin.co.kr/zf_user/jobs/relay/view?rec_idx=1",
                    "active": 1,
                    "company": {"detail": {"href": "https://company.example", "name": "데브아틀라스"}},
                    "position": {
                        "title": "백엔드 개발자",
                        "location": {"code": "101010,102000", "name": "서울 &gt; 강남구,경기 &gt; 성남시"},
                        "job-type": {"code": "1", "name": "정규직"},
                        "job-mid-code": {"code": "2", "name": "IT개발·데이터"},
                        "job-code": {"code": "84,92", "name": "백엔드"},
                        "experience-level": {"code": 1, "min": 0, "max": 0, "name": "신입"}
                    },
                    "keyword": "Rust, Go",
                    "id": "48213001",
                    "posting-timestamp": "1700000000",
                    "modification-timestamp": 1700003600,
                    "expiration-timestamp": null,
                    "read-cnt": "12"
                }]
            }
        }"#;

        let response: JobSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.jobs.total.as_i64(), Some(57));
        assert!(response.error_code().is_none());
        let job = &response.jobs.job[0];
        assert_eq!(job.active.as_str(), "1");
        assert_eq!(job.company.detail.name, "데브아틀라스");
        assert_eq!(job.position.job_code.code.as_str(), "84,92");
        assert_eq!(job.position.experience_level.min.as_str(), "0");
        assert!(job.expiration_timestamp.is_empty());
    }

    #[test]
    fn test_null_fields_decode_as_empty() {
        let body = r#"{"jobs": {"count": 1, "start": 0, "total": "1", "job": [{
            "url": null, "keyword": null, "id": "9",
            "company": {"detail": {"href": null, "name": "널회사"}},
            "position": {"title": null, "location": {"code": "101000", "name": null}, "job-type": null},
            "salary": null,
            "modification-timestamp": 1700000000
        }]}}"#;

        let response = JobSearchResponse::from_json(body).unwrap();
        let job = &response.jobs.job[0];
        assert_eq!(job.id, "9");
        assert!(job.keyword.is_empty());
        assert!(job.url.is_empty());
        assert!(job.company.detail.href.is_empty());
        assert_eq!(job.company.detail.name, "널회사");
        assert!(job.position.title.is_empty());
        assert!(job.position.location.name.is_empty());
        assert_eq!(job.position.location.code.as_str(), "101000");
    }

    #[test]
    fn test_raw_jobs_keep_original_values() {
        let body = r#"{"jobs": {"total": "1", "job": [{
            "id": "9", "keyword": null, "modification-timestamp": 1700000000, "unmodeled": {"x": 1}
        }]}}"#;

        let response = JobSearchResponse::from_json(body).unwrap();
        let raw = response.raw_job(0).unwrap();
        assert!(raw["keyword"].is_null());
        assert_eq!(raw["modification-timestamp"], 1_700_000_000);
        assert_eq!(raw["unmodeled"]["x"], 1);
        assert!(response.raw_job(1).is_none());
    }

    #[test]
    fn test_error_code_in_body() {
        let response: JobSearchResponse =
            serde_json::from_str(r#"{"code": 3, "message": "invalid access key"}"#).unwrap();
        assert_eq!(response.error_code(), Some(3));
        assert!(response.jobs.job.is_empty());
    }
}
