//! 재시도 정책
//!
//! 시도 횟수 한도, 재시도 대상 HTTP 상태, 상한이 있는 지수 백오프를 계산한다.
//! 실제 대기는 호출 측이 `rate_gate::sleep_or_cancel`로 수행한다.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 계산된 지연이 0일 때 쓰는 최소 지연
pub const FALLBACK_DELAY: Duration = Duration::from_millis(200);

/// 기본 재시도 대상 HTTP 상태 코드
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// 총 시도 횟수 (첫 요청 포함)
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// 이 상태 코드만 재시도한다
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(5))
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }

    /// Replace the retryable status set. An empty set keeps the defaults.
    #[must_use]
    pub fn with_retryable_statuses(mut self, statuses: Vec<u16>) -> Self {
        if !statuses.is_empty() {
            self.retryable_statuses = statuses;
        }
        self
    }

    /// Attempt budget, never below one
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Whether another attempt may follow `attempt` (1-based)
    #[must_use]
    pub fn has_attempts_after(&self, attempt: u32) -> bool {
        attempt < self.attempts()
    }

    #[must_use]
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Backoff before the attempt following `attempt` (1-based):
    /// `base * 2^(attempt-1)` capped at `max_delay`
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(63);
        let base_ms = self.base_delay.as_millis();
        let delay_ms = base_ms.checked_shl(shift).unwrap_or(u128::MAX);
        let delay_ms = if base_ms != 0 && delay_ms >> shift != base_ms {
            u128::MAX
        } else {
            delay_ms
        };

        let capped = if self.max_delay.is_zero() {
            delay_ms
        } else {
            delay_ms.min(self.max_delay.as_millis())
        };
        if capped == 0 {
            return FALLBACK_DELAY;
        }
        Duration::from_millis(u64::try_from(capped).unwrap_or(u64::MAX))
    }
}
