//! 설정 로딩과 검증
//!
//! 우선순위 (낮음 → 높음):
//! 1. 내장 기본값 (`defaults`)
//! 2. 설정 파일 (`config/devatlas.toml` 또는 `--config`)
//! 3. 환경 변수 `DEVATLAS_<SECTION>__<KEY>` (예: `DEVATLAS_API__ACCESS_KEY`)
//! 4. CLI 플래그 (바이너리에서 덮어씀)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::geocode::NominatimConfig;
use super::retry_policy::RetryPolicy;
use super::saramin::{JobSearchParams, SaraminClientConfig};
use crate::domain::window::WindowPlanner;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },

    #[error("invalid schedule time {value:?} (expected HH:MM)")]
    InvalidScheduleAt { value: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub geocode: GeocodeConfig,
    pub collection: CollectionConfig,
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

/// Saramin job-search API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub access_key: String,
    pub user_agent: String,
    /// Minimum interval between API calls
    pub min_interval_ms: u64,
    pub retry_attempts: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    /// HTTP statuses worth another attempt
    pub retry_statuses: Vec<u16>,
    pub request_timeout_secs: u64,
}

/// Nominatim geocoder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// When false, coordinates fall back to region centroids
    pub enabled: bool,
    pub base_url: String,
    pub user_agent: String,
    pub min_interval_ms: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub job_codes: Vec<String>,
    pub sr: Vec<String>,
    pub page_size: i64,
    pub sort: String,
    pub default_window_hours: i64,
    pub refetch_days: i64,
    /// Companies seen within this many days are listed as active
    pub current_days: i64,
    /// Deadline for a single run; 0 means none
    pub run_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Archive raw listings under `<data_dir>/raw`
    pub raw_enabled: bool,
    /// Write `<data_dir>/runs/run-<id>.json`
    pub run_log_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub enabled: bool,
    /// Daily local run time, `HH:MM`
    pub at: String,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    pub log_dir: PathBuf,

    pub file_name: String,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Enable automatic log cleanup on startup
    pub auto_cleanup_logs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::SARAMIN_BASE_URL.to_string(),
            access_key: String::new(),
            user_agent: defaults::SARAMIN_USER_AGENT.to_string(),
            min_interval_ms: defaults::MIN_INTERVAL_MS,
            retry_attempts: defaults::RETRY_ATTEMPTS,
            retry_base_ms: defaults::RETRY_BASE_MS,
            retry_max_ms: defaults::RETRY_MAX_MS,
            retry_statuses: defaults::RETRY_STATUSES.to_vec(),
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: defaults::NOMINATIM_BASE_URL.to_string(),
            user_agent: defaults::GEOCODE_USER_AGENT.to_string(),
            min_interval_ms: defaults::GEOCODE_MIN_INTERVAL_MS,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            job_codes: defaults::JOB_CODES.iter().map(|code| (*code).to_string()).collect(),
            sr: vec![defaults::SR_DIRECT_HIRE.to_string()],
            page_size: defaults::PAGE_SIZE,
            sort: defaults::SORT.to_string(),
            default_window_hours: defaults::DEFAULT_WINDOW_HOURS,
            refetch_days: defaults::REFETCH_DAYS,
            current_days: defaults::CURRENT_DAYS,
            run_timeout_secs: defaults::RUN_TIMEOUT_SECS,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(defaults::DATA_DIR),
            raw_enabled: true,
            run_log_enabled: true,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            at: defaults::SCHEDULE_AT.to_string(),
            max_attempts: defaults::SCHEDULE_MAX_ATTEMPTS,
            retry_delay_secs: defaults::SCHEDULE_RETRY_DELAY_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            file_name: defaults::LOG_FILE_NAME.to_string(),
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: defaults::LOG_AUTO_CLEANUP,
        }
    }
}

impl AppConfig {
    /// Layer defaults, the config file and `DEVATLAS_*` environment variables.
    ///
    /// An explicit `path` must exist; the default `config/devatlas.toml` is optional.
    /// Validation is left to the caller so CLI overrides can be applied first.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(defaults::CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("collection.job_codes")
                    .with_list_parse_key("collection.sr")
                    .with_list_parse_key("api.retry_statuses")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = settings.try_deserialize()?;
        config.apply_fallbacks();
        debug!(?path, "configuration loaded");
        Ok(config)
    }

    /// Zero or negative tunables fall back to their defaults
    pub fn apply_fallbacks(&mut self) {
        if self.api.min_interval_ms == 0 {
            self.api.min_interval_ms = defaults::MIN_INTERVAL_MS;
        }
        if self.api.retry_attempts == 0 {
            self.api.retry_attempts = defaults::RETRY_ATTEMPTS;
        }
        if self.api.retry_base_ms == 0 {
            self.api.retry_base_ms = defaults::RETRY_BASE_MS;
        }
        if self.api.retry_max_ms == 0 {
            self.api.retry_max_ms = defaults::RETRY_MAX_MS;
        }
        if self.api.retry_statuses.is_empty() {
            self.api.retry_statuses = defaults::RETRY_STATUSES.to_vec();
        }
        if self.collection.job_codes.is_empty() {
            self.collection.job_codes = CollectionConfig::default().job_codes;
        }
        if self.collection.default_window_hours <= 0 {
            self.collection.default_window_hours = defaults::DEFAULT_WINDOW_HOURS;
        }
        if self.collection.refetch_days <= 0 {
            self.collection.refetch_days = defaults::REFETCH_DAYS;
        }
        self.collection.current_days = self.collection.current_days.max(1);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.access_key.trim().is_empty() {
            return Err(ConfigError::validation(
                "missing access key (set --access-key or SARAMIN_ACCESS_KEY)",
            ));
        }
        if self.collection.page_size <= 0 {
            return Err(ConfigError::validation(
                "collection.page_size must be greater than 0",
            ));
        }
        if self.api.retry_max_ms < self.api.retry_base_ms {
            return Err(ConfigError::validation(format!(
                "api.retry_max_ms ({}) cannot be less than api.retry_base_ms ({})",
                self.api.retry_max_ms, self.api.retry_base_ms
            )));
        }
        if !self.logging.console_output && !self.logging.file_output {
            return Err(ConfigError::validation("no logging output configured"));
        }
        self.schedule_at()?;
        Ok(())
    }

    pub fn schedule_at(&self) -> Result<ScheduleAt, ConfigError> {
        self.schedule.at.parse()
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.api.retry_attempts,
            Duration::from_millis(self.api.retry_base_ms),
            Duration::from_millis(self.api.retry_max_ms),
        )
        .with_retryable_statuses(self.api.retry_statuses.clone())
    }

    #[must_use]
    pub fn saramin_client_config(&self) -> SaraminClientConfig {
        SaraminClientConfig {
            base_url: self.api.base_url.clone(),
            access_key: self.api.access_key.trim().to_string(),
            user_agent: self.api.user_agent.clone(),
            min_interval: Duration::from_millis(self.api.min_interval_ms),
            retry: self.retry_policy(),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
        }
    }

    #[must_use]
    pub fn nominatim_config(&self) -> NominatimConfig {
        NominatimConfig {
            base_url: self.geocode.base_url.clone(),
            user_agent: self.geocode.user_agent.clone(),
            min_interval: Duration::from_millis(self.geocode.min_interval_ms),
            request_timeout: Duration::from_secs(self.geocode.request_timeout_secs),
        }
    }

    #[must_use]
    pub fn window_planner(&self) -> WindowPlanner {
        WindowPlanner::new(
            chrono::Duration::hours(self.collection.default_window_hours),
            chrono::Duration::days(self.collection.refetch_days),
        )
    }

    /// Active-company cutoff distance
    #[must_use]
    pub fn current_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.collection.current_days.max(1))
    }

    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        (self.collection.run_timeout_secs > 0)
            .then(|| Duration::from_secs(self.collection.run_timeout_secs))
    }

    /// Parameters shared by every page request; the window bounds are filled in per pass
    #[must_use]
    pub fn base_search_params(&self) -> JobSearchParams {
        JobSearchParams {
            job_cd: self.collection.job_codes.clone(),
            sr: self.collection.sr.clone(),
            count: self.collection.page_size,
            sort: self.collection.sort.clone(),
            ..Default::default()
        }
    }

    pub fn log_summary(&self) {
        info!(
            base_url = %self.api.base_url,
            job_codes = self.collection.job_codes.len(),
            min_interval_ms = self.api.min_interval_ms,
            retry_attempts = self.api.retry_attempts,
            geocode = self.geocode.enabled,
            data_dir = %self.storage.data_dir.display(),
            "⚙️ configuration"
        );
    }
}

impl StorageConfig {
    #[must_use]
    pub fn region_counts_path(&self) -> PathBuf {
        self.data_dir.join(defaults::REGION_COUNTS_FILE)
    }

    #[must_use]
    pub fn latest_companies_path(&self) -> PathBuf {
        self.data_dir.join(defaults::LATEST_COMPANIES_FILE)
    }

    #[must_use]
    pub fn region_missing_path(&self) -> PathBuf {
        self.data_dir.join(defaults::REGION_MISSING_FILE)
    }

    #[must_use]
    pub fn run_state_path(&self) -> PathBuf {
        self.data_dir.join(defaults::RUN_STATE_FILE)
    }

    #[must_use]
    pub fn geocode_cache_path(&self) -> PathBuf {
        self.data_dir.join(defaults::GEOCODE_CACHE_FILE)
    }

    #[must_use]
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join(defaults::RAW_DIR)
    }

    #[must_use]
    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir.join(defaults::RUNS_DIR)
    }
}

/// Daily wall-clock time, `HH:MM` with hour 0-23 and minute 0-59
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleAt {
    pub hour: u32,
    pub minute: u32,
}

impl ScheduleAt {
    #[must_use]
    pub fn as_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for ScheduleAt {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidScheduleAt {
            value: value.to_string(),
        };
        let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;
        let minute: u32 = minute.trim().parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(Self { hour, minute })
    }
}

impl std::fmt::Display for ScheduleAt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Default configuration values
pub mod defaults {
    pub const CONFIG_FILE: &str = "config/devatlas";
    pub const ENV_PREFIX: &str = "DEVATLAS";

    // Saramin API
    pub const SARAMIN_BASE_URL: &str = crate::infrastructure::saramin::DEFAULT_BASE_URL;
    pub const SARAMIN_USER_AGENT: &str = crate::infrastructure::saramin::client::DEFAULT_USER_AGENT;
    pub const MIN_INTERVAL_MS: u64 = 200;
    pub const RETRY_ATTEMPTS: u32 = 3;
    pub const RETRY_BASE_MS: u64 = 500;
    pub const RETRY_MAX_MS: u64 = 5_000;
    pub const RETRY_STATUSES: [u16; 5] = crate::infrastructure::retry_policy::DEFAULT_RETRYABLE_STATUSES;
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    // Nominatim
    pub const NOMINATIM_BASE_URL: &str = crate::infrastructure::geocode::nominatim::DEFAULT_NOMINATIM_URL;
    pub const GEOCODE_USER_AGENT: &str = crate::infrastructure::geocode::nominatim::DEFAULT_USER_AGENT;
    pub const GEOCODE_MIN_INTERVAL_MS: u64 = 1_000;

    // Collection
    pub const SR_DIRECT_HIRE: &str = "directhire";
    pub const PAGE_SIZE: i64 = 110;
    pub const SORT: &str = "ud";
    pub const DEFAULT_WINDOW_HOURS: i64 = 24;
    pub const REFETCH_DAYS: i64 = 7;
    pub const CURRENT_DAYS: i64 = 21;
    pub const RUN_TIMEOUT_SECS: u64 = 0;

    /// IT / development job codes
    pub const JOB_CODES: &[&str] = &[
        "80", "82", "83", "84", "85", "86", "87", "90", "92", "95", "99", "100", "101", "103",
        "104", "106", "107", "108", "109", "111", "113", "116", "123", "124", "127", "128", "131",
        "132", "133", "135", "136", "139", "142", "145", "146", "148", "150", "156", "160", "161",
        "162", "164", "171", "172", "180", "181", "195", "234", "320", "2229", "2232", "2239",
        "2246", "2248", "2249",
    ];

    // Storage
    pub const DATA_DIR: &str = "data";
    pub const REGION_COUNTS_FILE: &str = "region_counts.json";
    pub const LATEST_COMPANIES_FILE: &str = "latest_companies.json";
    pub const REGION_MISSING_FILE: &str = "region_missing.jsonl";
    pub const RUN_STATE_FILE: &str = "run_state.json";
    pub const GEOCODE_CACHE_FILE: &str = "geocode_cache.json";
    pub const RAW_DIR: &str = "raw";
    pub const RUNS_DIR: &str = "runs";

    // Schedule
    pub const SCHEDULE_AT: &str = "00:10";
    pub const SCHEDULE_MAX_ATTEMPTS: u32 = 3;
    pub const SCHEDULE_RETRY_DELAY_SECS: u64 = 120;

    // Logging
    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
    pub const LOG_DIR: &str = "logs";
    pub const LOG_FILE_NAME: &str = "devatlas.log";
    pub const LOG_MAX_FILES: u32 = 5;
    pub const LOG_AUTO_CLEANUP: bool = true;
}
