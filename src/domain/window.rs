//! 수집 윈도우 계획
//!
//! 명시적 범위가 주어지면 수동 실행, 그렇지 않으면 마지막 성공 실행 시각부터 이어서
//! 수집하는 자동 실행이다. 자동 실행은 최근 변경분을 다시 훑는 refetch 윈도우를 추가한다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `[now - length, now)`
    #[must_use]
    pub fn trailing(now: DateTime<Utc>, length: Duration) -> Self {
        Self::new(now - length, now)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Caller supplied bounds. Either side set makes the run manual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplicitBounds {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ExplicitBounds {
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlan {
    pub primary: FetchWindow,
    /// Present only on automatic runs with a non-empty refetch range
    pub refetch: Option<FetchWindow>,
    pub automatic: bool,
}

impl WindowPlan {
    /// Windows in collection order
    pub fn windows(&self) -> impl Iterator<Item = FetchWindow> + '_ {
        std::iter::once(self.primary).chain(self.refetch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlanner {
    pub default_window: Duration,
    pub refetch_window: Duration,
}

impl Default for WindowPlanner {
    fn default() -> Self {
        Self {
            default_window: Duration::hours(24),
            refetch_window: Duration::days(7),
        }
    }
}

impl WindowPlanner {
    #[must_use]
    pub fn new(default_window: Duration, refetch_window: Duration) -> Self {
        Self {
            default_window,
            refetch_window,
        }
    }

    /// Plan a manual run from explicit bounds
    #[must_use]
    pub fn plan_explicit(&self, bounds: ExplicitBounds, now: DateTime<Utc>) -> WindowPlan {
        let end = bounds.end.unwrap_or(now);
        let start = bounds.start.unwrap_or(end - self.default_window);
        let primary = if start >= end {
            FetchWindow::trailing(now, self.default_window)
        } else {
            FetchWindow::new(start, end)
        };
        WindowPlan {
            primary,
            refetch: None,
            automatic: false,
        }
    }

    /// Plan an automatic run continuing from the last persisted run
    #[must_use]
    pub fn plan_automatic(
        &self,
        last_run_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> WindowPlan {
        let primary = match last_run_at {
            Some(last) if last < now => FetchWindow::new(last, now),
            _ => FetchWindow::trailing(now, self.default_window),
        };
        let refetch = FetchWindow::new(now - self.refetch_window, primary.end);
        WindowPlan {
            primary,
            refetch: (!refetch.is_empty()).then_some(refetch),
            automatic: true,
        }
    }

    /// Explicit bounds win; otherwise continue from `last_run_at`
    #[must_use]
    pub fn plan(
        &self,
        bounds: ExplicitBounds,
        last_run_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> WindowPlan {
        if bounds.is_set() {
            self.plan_explicit(bounds, now)
        } else {
            self.plan_automatic(last_run_at, now)
        }
    }
}
