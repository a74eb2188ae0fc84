//! 매일 정해진 시각 (로컬 시간) 수집 실행
//!
//! 실행이 실패하면 `retry_delay × attempt` 만큼 기다렸다가 다시 시도한다.
//! 취소되면 대기 중이든 실행 중이든 즉시 멈춘다.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::collector::{CollectError, Collector, RunSummary};
use crate::infrastructure::config::{AppConfig, ConfigError, ScheduleAt};
use crate::infrastructure::rate_gate::sleep_or_cancel;

/// Next wall-clock occurrence of `at` strictly after `now`
pub fn next_run_time<Tz: TimeZone>(now: &DateTime<Tz>, at: ScheduleAt) -> DateTime<Tz> {
    let tz = now.timezone();
    let today = now.date_naive();
    for offset in 0..=2 {
        let Some(date) = today.checked_add_days(chrono::Days::new(offset)) else {
            break;
        };
        // A nonexistent local time (DST gap) skips to the next day.
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at.as_time())).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
    }
    now.clone() + chrono::Duration::days(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyScheduler {
    at: ScheduleAt,
    max_attempts: u32,
    retry_delay: Duration,
}

impl DailyScheduler {
    #[must_use]
    pub fn new(at: ScheduleAt, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            at,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.schedule_at()?,
            config.schedule.max_attempts,
            Duration::from_secs(config.schedule.retry_delay_secs),
        ))
    }

    #[must_use]
    pub fn at(&self) -> ScheduleAt {
        self.at
    }

    /// Loop forever: sleep until the next run time, run with retry. Returns once cancelled.
    pub async fn run_daily(&self, collector: &Collector, cancel: &CancellationToken) {
        loop {
            let now = Local::now();
            let next = next_run_time(&now, self.at);
            let wait = (next.clone() - now).to_std().unwrap_or_default();
            info!(next = %next.format("%Y-%m-%d %H:%M %:z"), "⏰ next scheduled run");

            if sleep_or_cancel(wait, cancel).await.is_err() {
                info!("🛑 schedule stopped");
                return;
            }

            match self
                .run_with_retry(cancel, move |now| collector.run_once(now, cancel))
                .await
            {
                Ok(summary) => info!(%summary, "scheduled run finished"),
                Err(e) if e.is_cancelled() => {
                    info!("🛑 schedule stopped during run");
                    return;
                }
                Err(e) => error!(error = %e, "❌ scheduled run failed for today"),
            }
        }
    }

    /// Whole-run retry. Cancellation is never retried.
    pub async fn run_with_retry<F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut run: F,
    ) -> Result<RunSummary, CollectError>
    where
        F: FnMut(DateTime<Utc>) -> Fut,
        Fut: Future<Output = Result<RunSummary, CollectError>>,
    {
        let mut attempt = 1;
        loop {
            let err = match run(Utc::now()).await {
                Ok(summary) => return Ok(summary),
                Err(e) => e,
            };
            if err.is_cancelled() || cancel.is_cancelled() {
                return Err(CollectError::Cancelled);
            }
            if attempt >= self.max_attempts {
                return Err(err);
            }

            let delay = self.retry_delay * attempt;
            warn!(attempt, max_attempts = self.max_attempts, ?delay, error = %err, "run failed, retrying");
            if sleep_or_cancel(delay, cancel).await.is_err() {
                return Err(CollectError::Cancelled);
            }
            attempt += 1;
        }
    }
}
