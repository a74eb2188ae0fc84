//! Saramin job-search HTTP 클라이언트
//!
//! - 요청 전 `RateGate` 대기 (기본 200ms 간격)
//! - 429/5xx 및 전송 오류는 지수 백오프로 재시도
//! - 200 응답이라도 body 의 `code`가 0이 아니면 즉시 실패 (재시도 없음)
//! - 모든 대기와 요청은 `CancellationToken`과 경쟁

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::types::{ApiErrorBody, JobSearchResponse};
use crate::infrastructure::errors::SaraminError;
use crate::infrastructure::rate_gate::{RateGate, sleep_or_cancel};
use crate::infrastructure::retry_policy::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://oapi.saramin.co.kr";
pub const DEFAULT_USER_AGENT: &str = "devatlas-saramin-client/0.1";
pub const DEFAULT_FIELDS: [&str; 3] = ["posting-date", "expiration-date", "count"];
const JOB_SEARCH_PATH: &str = "job-search";

/// Query parameters for `GET /job-search`. Empty lists and zero values are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSearchParams {
    pub keywords: Vec<String>,
    pub job_cd: Vec<String>,
    pub job_mid_cd: Vec<String>,
    pub loc_cd: Vec<String>,
    pub sr: Vec<String>,
    pub fields: Vec<String>,
    pub updated_min: Option<DateTime<Utc>>,
    pub updated_max: Option<DateTime<Utc>>,
    pub published_min: Option<DateTime<Utc>>,
    pub published_max: Option<DateTime<Utc>>,
    pub start: i64,
    pub count: i64,
    pub sort: String,
}

impl JobSearchParams {
    /// Query pairs sorted by key
    pub fn encode(&self, access_key: &str) -> Result<BTreeMap<&'static str, String>, SaraminError> {
        let access_key = access_key.trim();
        if access_key.is_empty() {
            return Err(SaraminError::MissingAccessKey);
        }

        let mut pairs = BTreeMap::new();
        pairs.insert("access-key", access_key.to_string());

        let lists = [
            ("keywords", &self.keywords),
            ("job_cd", &self.job_cd),
            ("job_mid_cd", &self.job_mid_cd),
            ("loc_cd", &self.loc_cd),
            ("sr", &self.sr),
            ("fields", &self.fields),
        ];
        for (key, values) in lists {
            if !values.is_empty() {
                pairs.insert(key, values.join(","));
            }
        }

        let times = [
            ("updated_min", self.updated_min),
            ("updated_max", self.updated_max),
            ("published_min", self.published_min),
            ("published_max", self.published_max),
        ];
        for (key, value) in times {
            if let Some(value) = value {
                pairs.insert(key, value.timestamp().to_string());
            }
        }

        if self.start > 0 {
            pairs.insert("start", self.start.to_string());
        }
        if self.count > 0 {
            pairs.insert("count", self.count.to_string());
        }
        if !self.sort.trim().is_empty() {
            pairs.insert("sort", self.sort.clone());
        }
        Ok(pairs)
    }
}

#[derive(Debug, Clone)]
pub struct SaraminClientConfig {
    pub base_url: String,
    pub access_key: String,
    pub user_agent: String,
    pub min_interval: Duration,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
}

impl Default for SaraminClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_key: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_interval: Duration::from_millis(200),
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Single attempt outcome before classification
enum Attempt {
    Response { status: u16, body: String },
    Transport(reqwest::Error),
}

pub struct SaraminClient {
    http: Client,
    endpoint: Url,
    access_key: String,
    gate: RateGate,
    retry: RetryPolicy,
}

impl SaraminClient {
    pub fn new(config: SaraminClientConfig) -> Result<Self, SaraminError> {
        let endpoint = job_search_endpoint(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if !config.user_agent.trim().is_empty() {
            let agent = HeaderValue::from_str(&config.user_agent).map_err(|e| {
                SaraminError::InvalidUrl {
                    url: config.base_url.clone(),
                    reason: format!("invalid user agent: {e}"),
                }
            })?;
            headers.insert(USER_AGENT, agent);
        }

        let http = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_key: config.access_key,
            gate: RateGate::new(config.min_interval),
            retry: config.retry,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// One `job-search` call with rate limiting and retries
    pub async fn job_search(
        &self,
        params: &JobSearchParams,
        cancel: &CancellationToken,
    ) -> Result<JobSearchResponse, SaraminError> {
        let url = self.request_url(params)?;

        let mut attempt = 1;
        loop {
            let retry_reason = match self.execute(&url, cancel).await? {
                Attempt::Response { status: 200, body } => return decode_success(&body),
                Attempt::Response { status, body } => {
                    if !self.retry.is_retryable_status(status) || !self.retry.has_attempts_after(attempt) {
                        return Err(decode_api_error(status, &body));
                    }
                    format!("http status {status}")
                }
                Attempt::Transport(err) => {
                    if !self.retry.has_attempts_after(attempt) {
                        return Err(SaraminError::Transport(err));
                    }
                    err.to_string()
                }
            };

            let delay = self.retry.delay_for(attempt);
            warn!(
                attempt,
                max_attempts = self.retry.attempts(),
                delay_ms = delay.as_millis() as u64,
                reason = %retry_reason,
                "🔄 saramin request failed, retrying"
            );
            sleep_or_cancel(delay, cancel)
                .await
                .map_err(|_| SaraminError::Cancelled)?;
            attempt += 1;
        }
    }

    fn request_url(&self, params: &JobSearchParams) -> Result<Url, SaraminError> {
        let mut params = params.clone();
        if params.fields.is_empty() {
            params.fields = DEFAULT_FIELDS.iter().map(ToString::to_string).collect();
        }
        let pairs = params.encode(&self.access_key)?;

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().extend_pairs(pairs.iter());
        Ok(url)
    }

    async fn execute(&self, url: &Url, cancel: &CancellationToken) -> Result<Attempt, SaraminError> {
        self.gate
            .wait(cancel)
            .await
            .map_err(|_| SaraminError::Cancelled)?;

        debug!(start = ?query_value(url, "start"), "📡 saramin job-search request");
        let exchange = async {
            let response = self.http.get(url.clone()).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SaraminError::Cancelled),
            result = exchange => Ok(match result {
                Ok((status, body)) => Attempt::Response { status, body },
                Err(err) => Attempt::Transport(err),
            }),
        }
    }
}

impl std::fmt::Debug for SaraminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaraminClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("gate", &self.gate)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

fn job_search_endpoint(base_url: &str) -> Result<Url, SaraminError> {
    let base = if base_url.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        base_url.trim()
    };
    let joined = format!("{}/{JOB_SEARCH_PATH}", base.trim_end_matches('/'));
    Url::parse(&joined).map_err(|e| SaraminError::InvalidUrl {
        url: joined.clone(),
        reason: e.to_string(),
    })
}

fn decode_success(body: &str) -> Result<JobSearchResponse, SaraminError> {
    let response = JobSearchResponse::from_json(body)?;
    if let Some(code) = response.error_code() {
        return Err(SaraminError::Api {
            code,
            message: response.message.clone().unwrap_or_default(),
            status: 200,
        });
    }
    Ok(response)
}

fn decode_api_error(status: u16, body: &str) -> SaraminError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(api) if api.code != 0 => SaraminError::Api {
            code: api.code,
            message: api.message,
            status,
        },
        _ => SaraminError::HttpStatus { status },
    }
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
