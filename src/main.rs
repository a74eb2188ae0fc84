//! devatlas CLI
//!
//! ```bash
//! # one automatic run (continues from data/run_state.json)
//! SARAMIN_ACCESS_KEY=... devatlas
//!
//! # explicit window, no refetch pass, run state untouched
//! devatlas --updated-min 1735657200 --updated-max 1735743600
//!
//! # daily at 00:10 local time
//! devatlas --schedule --schedule-at 00:10
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use devatlas_lib::application::{Collector, DailyScheduler};
use devatlas_lib::domain::ExplicitBounds;
use devatlas_lib::infrastructure::AppConfig;
use devatlas_lib::infrastructure::logging::{init_logging_with_config, log_system_info};
use devatlas_lib::infrastructure::saramin::split_csv;

#[derive(Parser, Debug)]
#[command(
    name = "devatlas",
    version,
    about = "Collect Saramin IT job listings and aggregate hiring by region"
)]
struct Cli {
    /// Config file (TOML). Defaults to config/devatlas.toml when present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Saramin access key
    #[arg(long, env = "SARAMIN_ACCESS_KEY", hide_env_values = true)]
    access_key: Option<String>,

    /// Comma-separated job codes
    #[arg(long)]
    job_cd: Option<String>,

    /// Updated min (unix seconds); a positive value makes the run manual
    #[arg(long, default_value_t = 0)]
    updated_min: i64,

    /// Updated max (unix seconds); a positive value makes the run manual
    #[arg(long, default_value_t = 0)]
    updated_max: i64,

    /// Run the daily schedule loop
    #[arg(long)]
    schedule: bool,

    /// Daily run time (HH:MM, local time)
    #[arg(long)]
    schedule_at: Option<String>,

    /// Refetch window in days for automatic runs
    #[arg(long)]
    refetch_days: Option<i64>,

    /// Current hiring window in days
    #[arg(long)]
    current_days: Option<i64>,

    /// Minimum interval between API calls in ms
    #[arg(long)]
    min_interval_ms: Option<u64>,

    /// Max attempts per API call
    #[arg(long)]
    retry_attempts: Option<u32>,

    /// Retry base delay in ms
    #[arg(long)]
    retry_base_ms: Option<u64>,

    /// Retry max delay in ms
    #[arg(long)]
    retry_max_ms: Option<u64>,

    /// Cancel a single run that takes longer than this; the schedule keeps going
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Directory for outputs, state and caches
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Skip geocoding; companies fall back to region centroids
    #[arg(long)]
    no_geocode: bool,
}

impl Cli {
    /// Overlay flags on the loaded config and return the explicit window bounds
    fn apply(&self, config: &mut AppConfig) -> ExplicitBounds {
        if let Some(key) = self.access_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            config.api.access_key = key.to_string();
        }
        if let Some(codes) = self.job_cd.as_deref().map(split_csv).filter(|c| !c.is_empty()) {
            config.collection.job_codes = codes;
        }
        if self.schedule {
            config.schedule.enabled = true;
        }
        if let Some(at) = &self.schedule_at {
            config.schedule.at.clone_from(at);
        }
        if let Some(days) = self.refetch_days {
            config.collection.refetch_days = days;
        }
        if let Some(days) = self.current_days {
            config.collection.current_days = days;
        }
        if let Some(ms) = self.min_interval_ms {
            config.api.min_interval_ms = ms;
        }
        if let Some(attempts) = self.retry_attempts {
            config.api.retry_attempts = attempts;
        }
        if let Some(ms) = self.retry_base_ms {
            config.api.retry_base_ms = ms;
        }
        if let Some(ms) = self.retry_max_ms {
            config.api.retry_max_ms = ms;
        }
        if let Some(secs) = self.timeout_secs {
            config.collection.run_timeout_secs = secs;
        }
        if let Some(dir) = &self.data_dir {
            config.storage.data_dir.clone_from(dir);
        }
        if self.no_geocode {
            config.geocode.enabled = false;
        }

        ExplicitBounds {
            start: unix_seconds(self.updated_min),
            end: unix_seconds(self.updated_max),
        }
    }
}

/// Positive unix seconds only
fn unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    (secs > 0).then(|| DateTime::from_timestamp(secs, 0)).flatten()
}

/// Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let bounds = cli.apply(&mut config);
    config.apply_fallbacks();
    config.validate().context("Invalid configuration")?;

    init_logging_with_config(&config.logging).context("Failed to initialize logging")?;
    log_system_info();
    config.log_summary();

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                () = shutdown_signal() => {
                    warn!("🛑 shutdown signal received, cancelling");
                    cancel.cancel();
                }
                () = cancel.cancelled() => {}
            }
        }
    });

    let collector = Collector::from_config(&config, bounds).context("Failed to build collector")?;

    if config.schedule.enabled {
        let scheduler = DailyScheduler::from_config(&config)?;
        info!(at = %scheduler.at(), "📅 daily schedule started");
        scheduler.run_daily(&collector, &cancel).await;
        return Ok(());
    }

    let summary = collector
        .run_once(Utc::now(), &cancel)
        .await
        .context("Collection run failed")?;
    println!("{summary}");
    Ok(())
}
