use crate::models::{FundingSource, LotteryType};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::time::Duration;

/// Pi Network wallet/payment configuration
#[derive(Debug, Clone, Serialize)]
pub struct PiConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub sandbox: bool,
    pub payment_latency_ms: u64,
}

/// Ad-funded entry configuration
#[derive(Debug, Clone, Serialize)]
pub struct AdConfig {
    /// Seconds an ad must play before the verification question
    pub watch_seconds: u32,
    /// Idle seconds after which an unfinished ad session is dropped
    pub session_ttl_seconds: u32,
}

/// Feature switches read by the entry service
#[derive(Debug, Clone, Serialize)]
pub struct FeatureFlags {
    pub ad_entries: bool,
    pub paid_entries: bool,
    pub realtime: bool,
}

/// Application configuration
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub pi: PiConfig,
    pub ads: AdConfig,
    pub features: FeatureFlags,
    pub lottery_types: Vec<LotteryType>,
    pub log_level: String,
    pub log_format: String,
    pub environment: String,
    /// Seconds between roll-over / countdown ticks of the service loop
    pub tick_seconds: u64,
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|s| s.parse::<bool>().ok())
        .unwrap_or(default)
}

impl PiConfig {
    /// Create Pi config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let api_key = env::var("PI_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let sandbox = env_bool("PI_SANDBOX", true);

        let payment_latency_ms = env::var("PAYMENT_LATENCY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);

        if !sandbox && api_key.is_none() {
            return Err("PI_API_KEY is required when PI_SANDBOX=false".to_string());
        }

        Ok(Self {
            api_key,
            sandbox,
            payment_latency_ms,
        })
    }

    /// Get simulated gateway latency as Duration
    pub fn payment_latency(&self) -> Duration {
        Duration::from_millis(self.payment_latency_ms)
    }
}

impl Default for PiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            sandbox: true,
            payment_latency_ms: 0,
        }
    }
}

impl AdConfig {
    pub fn from_env() -> Result<Self, String> {
        let watch_seconds = env::var("AD_WATCH_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(30);

        let session_ttl_seconds = env::var("AD_SESSION_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(600);

        if watch_seconds == 0 {
            return Err("AD_WATCH_SECONDS must be greater than 0".to_string());
        }
        if session_ttl_seconds <= watch_seconds {
            return Err("AD_SESSION_TTL_SECONDS must be longer than AD_WATCH_SECONDS".to_string());
        }

        Ok(Self {
            watch_seconds,
            session_ttl_seconds,
        })
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.session_ttl_seconds))
    }
}

impl Default for AdConfig {
    fn default() -> Self {
        Self {
            watch_seconds: 30,
            session_ttl_seconds: 600,
        }
    }
}

impl FeatureFlags {
    pub fn from_env() -> Self {
        Self {
            ad_entries: env_bool("FEATURE_AD_ENTRIES", true),
            paid_entries: env_bool("FEATURE_PAID_ENTRIES", true),
            realtime: env_bool("FEATURE_REALTIME", true),
        }
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            ad_entries: true,
            paid_entries: true,
            realtime: true,
        }
    }
}

/// Lottery catalog used when `LOTTERY_TYPES_JSON` is not set
pub fn default_lottery_types() -> Vec<LotteryType> {
    vec![
        LotteryType {
            id: "daily_pi".to_string(),
            name: "Daily Pi Lottery".to_string(),
            funding: FundingSource::Paid,
            entry_fee: Decimal::ONE,
            platform_fee: Decimal::new(1, 1),
            ad_value: Decimal::ZERO,
            min_participants: 5,
            max_tickets_per_user: 3,
            draw_interval_hours: 24,
        },
        LotteryType {
            id: "daily_ads".to_string(),
            name: "Daily Ads Lottery".to_string(),
            funding: FundingSource::AdFunded,
            entry_fee: Decimal::ZERO,
            platform_fee: Decimal::ZERO,
            ad_value: Decimal::new(1, 3),
            min_participants: 10,
            max_tickets_per_user: 5,
            draw_interval_hours: 24,
        },
        LotteryType {
            id: "weekly_pi".to_string(),
            name: "Weekly Pi Lottery".to_string(),
            funding: FundingSource::Paid,
            entry_fee: Decimal::new(5, 0),
            platform_fee: Decimal::new(5, 1),
            ad_value: Decimal::ZERO,
            min_participants: 20,
            max_tickets_per_user: 10,
            draw_interval_hours: 168,
        },
    ]
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let pi = PiConfig::from_env()?;
        let ads = AdConfig::from_env()?;
        let features = FeatureFlags::from_env();

        let lottery_types = match env::var("LOTTERY_TYPES_JSON") {
            Ok(json) => serde_json::from_str::<Vec<LotteryType>>(&json)
                .map_err(|e| format!("Invalid LOTTERY_TYPES_JSON: {}", e))?,
            Err(_) => default_lottery_types(),
        };

        let log_level = env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string());

        let log_format = env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string());

        let environment = env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        let tick_seconds = env::var("TICK_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(60);

        let config = Self {
            pi,
            ads,
            features,
            lottery_types,
            log_level: log_level.to_lowercase(),
            log_format: log_format.to_lowercase(),
            environment: environment.to_lowercase(),
            tick_seconds,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that cannot be expressed in the types
    pub fn validate(&self) -> Result<(), String> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                self.log_level, valid_log_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(format!(
                "Invalid LOG_FORMAT: {}. Must be one of: {:?}",
                self.log_format, valid_formats
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.environment.as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                self.environment, valid_environments
            ));
        }

        if self.tick_seconds == 0 {
            return Err("TICK_SECONDS must be greater than 0".to_string());
        }

        if self.is_production() && self.pi.sandbox {
            return Err("PI_SANDBOX must be false in production".to_string());
        }

        if self.lottery_types.is_empty() {
            return Err("At least one lottery type must be configured".to_string());
        }
        for (i, lottery) in self.lottery_types.iter().enumerate() {
            lottery.validate()?;
            if self.lottery_types[..i].iter().any(|other| other.id == lottery.id) {
                return Err(format!("Duplicate lottery type id: {}", lottery.id));
            }
        }

        Ok(())
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Service loop period as Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_seconds)
    }

    pub fn lottery_type(&self, id: &str) -> Option<&LotteryType> {
        self.lottery_types.iter().find(|t| t.id == id)
    }

    /// Look up a dotted path such as `features.ad_entries` or `lottery_types.0.name`
    pub fn get(&self, path: &str) -> Option<Value> {
        let mut current = serde_json::to_value(self).ok()?;
        for key in path.split('.').filter(|k| !k.is_empty()) {
            current = match current {
                Value::Object(mut map) => map.remove(key)?,
                Value::Array(mut items) => {
                    let index = key.parse::<usize>().ok()?;
                    if index >= items.len() {
                        return None;
                    }
                    items.swap_remove(index)
                }
                _ => return None,
            };
        }
        Some(current)
    }

    /// Typed `get`, falling back to `default` when missing or mistyped
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get(path)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or(default)
    }

    pub fn is_feature_enabled(&self, feature: &str) -> bool {
        self.get_or(&format!("features.{}", feature), false)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pi: PiConfig::default(),
            ads: AdConfig::default(),
            features: FeatureFlags::default(),
            lottery_types: default_lottery_types(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            environment: "development".to_string(),
            tick_seconds: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.ads.watch_seconds, 30);
        assert_eq!(config.ads.session_ttl(), chrono::Duration::minutes(10));
        assert_eq!(config.lottery_types.len(), 3);
    }

    #[test]
    fn test_tick_interval() {
        let mut config = AppConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(60));
        assert_eq!(config.get_or("tick_seconds", 0u64), 60);

        config.tick_seconds = 0;
        assert!(config.validate().unwrap_err().contains("TICK_SECONDS"));
    }

    #[test]
    fn test_nested_lookup() {
        let config = AppConfig::default();
        assert_eq!(config.get_or("ads.watch_seconds", 0u32), 30);
        assert_eq!(
            config.get_or("lottery_types.1.id", String::new()),
            "daily_ads"
        );
        assert_eq!(config.get_or("lottery_types.9.id", "none".to_string()), "none");
        assert_eq!(config.get_or("missing.key", 7u32), 7);
        assert!(config.get("pi.api_key").is_none());
    }

    #[test]
    fn test_feature_flags() {
        let mut config = AppConfig::default();
        assert!(config.is_feature_enabled("ad_entries"));
        config.features.paid_entries = false;
        assert!(!config.is_feature_enabled("paid_entries"));
        assert!(!config.is_feature_enabled("unknown_feature"));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_sandbox_in_production() {
        let mut config = AppConfig::default();
        let duplicate = config.lottery_types[0].clone();
        config.lottery_types.push(duplicate);
        assert!(config.validate().unwrap_err().contains("Duplicate"));

        let mut config = AppConfig::default();
        config.environment = "production".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_lottery_type_lookup() {
        let config = AppConfig::default();
        assert!(config.lottery_type("weekly_pi").is_some());
        assert!(config.lottery_type("monthly").is_none());
    }
}
