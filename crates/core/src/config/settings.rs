//! Analytics configuration with profile support.
//!
//! Provides the fetch, behavior and cache parameters for every command, with
//! named profiles (default, backfill, quick) and TOML overrides.

use liquidations_api::{PaginationConfig, DEFAULT_GATEWAY_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::env::expand_env;

/// Environment variable naming a TOML config file.
pub const CONFIG_PATH_ENV: &str = "ANALYTICS_CONFIG";
/// Environment variable selecting a built-in profile.
pub const PROFILE_ENV: &str = "ANALYTICS_PROFILE";

/// Per-run values from the command line, applied over the loaded config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    pub min_size: Option<f64>,
    pub window_hours: Option<u32>,
    pub days_back: Option<u32>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Directory holding the per-asset tables
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Upstream gateway
    #[serde(default)]
    pub api: ApiConfig,

    /// Paging, retries and rate limits
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Behavior classification parameters
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Dataset cache lifetimes
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// The Graph gateway settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Gateway API key; `${VAR}` references are expanded on load
    #[serde(default = "default_api_key")]
    pub api_key: String,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}
fn default_api_key() -> String {
    "${GRAPH_API_KEY}".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            gateway_url: default_gateway_url(),
            api_key: default_api_key(),
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("gateway_url", &self.gateway_url)
            .field("api_key_set", &self.has_api_key())
            .finish()
    }
}

impl ApiConfig {
    /// Whether a usable key is present (not empty, not an unexpanded reference).
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_key.contains("${")
    }
}

/// Paging and rate-limit settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Records per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Attempts per page
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Inter-page delay for liquidation fetches (milliseconds)
    #[serde(default = "default_liquidation_delay")]
    pub liquidation_delay_ms: u64,

    /// Inter-page and inter-account delay for user-action fetches (milliseconds)
    #[serde(default = "default_action_delay")]
    pub action_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Lookback for liquidation updates (days)
    #[serde(default = "default_days_back")]
    pub days_back: u32,
}

fn default_page_size() -> u32 {
    1000
}
fn default_max_retries() -> u32 {
    3
}
fn default_liquidation_delay() -> u64 {
    500
}
fn default_action_delay() -> u64 {
    300
}
fn default_request_timeout() -> u64 {
    30
}
fn default_days_back() -> u32 {
    1460
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_retries: default_max_retries(),
            liquidation_delay_ms: default_liquidation_delay(),
            action_delay_ms: default_action_delay(),
            request_timeout_secs: default_request_timeout(),
            days_back: default_days_back(),
        }
    }
}

impl FetchConfig {
    pub fn liquidation_delay(&self) -> Duration {
        Duration::from_millis(self.liquidation_delay_ms)
    }
    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Pagination for liquidation fetches.
    pub fn liquidation_pagination(&self) -> PaginationConfig {
        PaginationConfig {
            page_size: self.page_size,
            max_retries: self.max_retries,
            rate_limit_delay: self.liquidation_delay(),
        }
    }

    /// Pagination for user-action fetches.
    pub fn action_pagination(&self) -> PaginationConfig {
        PaginationConfig {
            page_size: self.page_size,
            max_retries: self.max_retries,
            rate_limit_delay: self.action_delay(),
        }
    }

    /// Lookback in seconds.
    pub fn lookback_secs(&self) -> i64 {
        i64::from(self.days_back) * 86_400
    }
}

/// Behavior classification parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Minimum liquidation size in native units
    #[serde(default = "default_min_size")]
    pub min_size: f64,

    /// Lookback window before each liquidation (hours)
    #[serde(default = "default_window_hours")]
    pub window_hours: u32,
}

fn default_min_size() -> f64 {
    1.0
}
fn default_window_hours() -> u32 {
    48
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            window_hours: default_window_hours(),
        }
    }
}

impl BehaviorConfig {
    pub fn window_secs(&self) -> i64 {
        i64::from(self.window_hours) * 3600
    }
}

/// Dataset cache lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_liquidations_ttl")]
    pub liquidations_ttl_secs: u64,

    #[serde(default = "default_actions_ttl")]
    pub actions_ttl_secs: u64,
}

fn default_liquidations_ttl() -> u64 {
    600
}
fn default_actions_ttl() -> u64 {
    3600
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            liquidations_ttl_secs: default_liquidations_ttl(),
            actions_ttl_secs: default_actions_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn liquidations_ttl(&self) -> Duration {
        Duration::from_secs(self.liquidations_ttl_secs)
    }
    pub fn actions_ttl(&self) -> Duration {
        Duration::from_secs(self.actions_ttl_secs)
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            data_dir: default_data_dir(),
            api: ApiConfig::default(),
            fetch: FetchConfig::default(),
            behavior: BehaviorConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.expand_env_vars();
        Ok(config)
    }

    /// Full-history profile: longer lookback, gentler on the gateway.
    pub fn backfill() -> Self {
        Self {
            profile: "backfill".to_string(),
            fetch: FetchConfig {
                max_retries: 5,
                liquidation_delay_ms: 1000,
                action_delay_ms: 600,
                request_timeout_secs: 60,
                days_back: 2920,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Short lookback for smoke runs.
    pub fn quick() -> Self {
        Self {
            profile: "quick".to_string(),
            fetch: FetchConfig {
                page_size: 500,
                max_retries: 2,
                liquidation_delay_ms: 200,
                action_delay_ms: 100,
                request_timeout_secs: 15,
                days_back: 30,
            },
            behavior: BehaviorConfig {
                min_size: 5.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Built-in profile by name. Unknown names fall back to the default.
    pub fn profile(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "backfill" | "full" => Self::backfill(),
            "quick" | "smoke" => Self::quick(),
            _ => Self::default(),
        }
    }

    /// Load from `ANALYTICS_CONFIG` if set, else the `ANALYTICS_PROFILE` profile.
    pub fn from_env() -> anyhow::Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(path);
        }
        let profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| "default".to_string());
        let mut config = Self::profile(&profile);
        config.expand_env_vars();
        Ok(config)
    }

    /// Replace configured values with any per-run overrides.
    pub fn apply_overrides(&mut self, overrides: &RunOverrides) {
        if let Some(min_size) = overrides.min_size {
            self.behavior.min_size = min_size;
        }
        if let Some(window_hours) = overrides.window_hours {
            self.behavior.window_hours = window_hours;
        }
        if let Some(days_back) = overrides.days_back {
            self.fetch.days_back = days_back;
        }
    }

    /// Expand `${VAR}` references in string values.
    pub fn expand_env_vars(&mut self) {
        self.api.gateway_url = expand_env(&self.api.gateway_url);
        self.api.api_key = expand_env(&self.api.api_key);
        if let Some(dir) = self.data_dir.to_str() {
            self.data_dir = PathBuf::from(expand_env(dir));
        }
    }

    /// Log the current configuration. The API key is never logged.
    pub fn log_config(&self) {
        tracing::info!(
            profile = %self.profile,
            data_dir = %self.data_dir.display(),
            "Analytics configuration loaded"
        );
        tracing::info!(
            gateway = %self.api.gateway_url,
            api_key_set = self.api.has_api_key(),
            "Gateway"
        );
        tracing::info!(
            page_size = self.fetch.page_size,
            max_retries = self.fetch.max_retries,
            liquidation_delay_ms = self.fetch.liquidation_delay_ms,
            action_delay_ms = self.fetch.action_delay_ms,
            timeout_secs = self.fetch.request_timeout_secs,
            days_back = self.fetch.days_back,
            "Fetch parameters"
        );
        tracing::info!(
            min_size = self.behavior.min_size,
            window_hours = self.behavior.window_hours,
            "Behavior parameters"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyticsConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.fetch.page_size, 1000);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.fetch.liquidation_delay(), Duration::from_millis(500));
        assert_eq!(config.fetch.action_delay(), Duration::from_millis(300));
        assert_eq!(config.fetch.days_back, 1460);
        assert_eq!(config.behavior.min_size, 1.0);
        assert_eq!(config.behavior.window_secs(), 48 * 3600);
        assert_eq!(config.cache.liquidations_ttl(), Duration::from_secs(600));
        assert_eq!(config.api.api_key, "${GRAPH_API_KEY}");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AnalyticsConfig = toml::from_str(
            r#"
            data_dir = "/tmp/liq"
            [fetch]
            page_size = 250
            [behavior]
            window_hours = 24
            "#,
        )
        .unwrap();

        assert_eq!(config.profile, "default");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/liq"));
        assert_eq!(config.fetch.page_size, 250);
        assert_eq!(config.fetch.max_retries, 3);
        assert_eq!(config.behavior.window_hours, 24);
        assert_eq!(config.behavior.min_size, 1.0);
        assert_eq!(config.cache.actions_ttl_secs, 3600);
    }

    #[test]
    fn test_profiles() {
        assert_eq!(AnalyticsConfig::profile("backfill").fetch.days_back, 2920);
        assert_eq!(AnalyticsConfig::profile("QUICK").profile, "quick");
        assert_eq!(AnalyticsConfig::profile("unknown").profile, "default");
    }

    #[test]
    fn test_pagination_helpers() {
        let fetch = FetchConfig::default();
        let liq = fetch.liquidation_pagination();
        let act = fetch.action_pagination();
        assert_eq!(liq.page_size, 1000);
        assert_eq!(liq.rate_limit_delay, Duration::from_millis(500));
        assert_eq!(act.rate_limit_delay, Duration::from_millis(300));
        assert_eq!(fetch.lookback_secs(), 1460 * 86_400);
    }

    #[test]
    fn test_run_overrides() {
        let mut config = AnalyticsConfig::quick();
        config.apply_overrides(&RunOverrides::default());
        assert_eq!(config.behavior.min_size, 5.0);
        assert_eq!(config.fetch.days_back, 30);

        config.apply_overrides(&RunOverrides {
            min_size: Some(2.5),
            window_hours: Some(72),
            days_back: None,
        });
        assert_eq!(config.behavior.min_size, 2.5);
        assert_eq!(config.behavior.window_secs(), 72 * 3600);
        assert_eq!(config.fetch.days_back, 30);
    }

    #[test]
    fn test_api_key_expansion() {
        std::env::set_var("SETTINGS_TEST_GRAPH_KEY", "k-123");
        let mut config = AnalyticsConfig::default();
        config.api.api_key = "${SETTINGS_TEST_GRAPH_KEY}".to_string();
        assert!(!config.api.has_api_key());

        config.expand_env_vars();
        assert_eq!(config.api.api_key, "k-123");
        assert!(config.api.has_api_key());
        assert!(!format!("{:?}", config.api).contains("k-123"));
        std::env::remove_var("SETTINGS_TEST_GRAPH_KEY");
    }
}
