//! DevAtlas - incremental Saramin job collector
//!
//! Collects IT job listings from the Saramin job-search API, resolves work locations to
//! coordinates through a cached geocoder, and writes per-region hiring aggregates.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod utils;
