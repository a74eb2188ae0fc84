//! Infrastructure layer for external APIs, local files, configuration and logging

pub mod config;
pub mod errors;
pub mod geocode;
pub mod json_file;
pub mod logging;
pub mod output;
pub mod rate_gate;
pub mod raw_store;
pub mod retry_policy;
pub mod run_log;
pub mod run_state;
pub mod saramin;

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, LoggingConfig, ScheduleAt};
pub use errors::{GeocodeError, SaraminError, StoreError};
pub use geocode::{GeoCache, GeoResolver, Geocoder, NominatimGeocoder};
pub use logging::init_logging_with_config;
pub use rate_gate::RateGate;
pub use retry_policy::RetryPolicy;
pub use saramin::{JobSearchParams, SaraminClient, SaraminClientConfig};
