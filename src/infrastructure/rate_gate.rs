//! 최소 요청 간격 게이트
//!
//! governor 의 direct limiter (burst 1) 로 "다음 요청 가능 시각"을 관리한다.
//! 대기는 항상 `CancellationToken`과 경쟁한다.

use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// The wait was interrupted by cancellation
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("wait cancelled")]
pub struct Cancelled;

pub struct RateGate {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    min_interval: Duration,
}

impl RateGate {
    /// A zero interval disables the gate
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        let limiter = Quota::with_period(min_interval).map(RateLimiter::direct);
        Self {
            limiter,
            min_interval,
        }
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next request may be sent
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Cancelled),
            () = limiter.until_ready() => {
                trace!(interval_ms = self.min_interval.as_millis() as u64, "rate gate passed");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateGate")
            .field("min_interval", &self.min_interval)
            .finish_non_exhaustive()
    }
}

/// Cancelable sleep used for retry backoff
pub async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> Result<(), Cancelled> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}
