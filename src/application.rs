//! Application layer
//!
//! - `collector`: one collection run wiring the domain and infrastructure together
//! - `scheduler`: daily timer with whole-run retry

pub mod collector;
pub mod scheduler;

pub use collector::{CollectError, Collector, CollectorSettings, RunSummary};
pub use scheduler::{DailyScheduler, next_run_time};
