//! Configuration for the analytics commands.
//!
//! This module provides:
//! - Runtime configuration (profiles, fetch limits, behavior window, cache TTLs)
//! - `${VAR}` / `${VAR:-fallback}` expansion for values sourced from the environment
//! - Per-run command-line overrides

mod env;
mod settings;

pub use env::expand_env;
pub use settings::{
    AnalyticsConfig, ApiConfig, BehaviorConfig, CacheConfig, FetchConfig, RunOverrides,
    CONFIG_PATH_ENV, PROFILE_ENV,
};
