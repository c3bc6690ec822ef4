use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::EoAccessError;

pub const MAX_POOL_SIZE_KEY: &str = "MaxPoolSize";
pub const MAX_CHANNEL_WAIT_TIME_KEY: &str = "MaxChannelWaitTime";
pub const MAX_CHANNEL_AGE_KEY: &str = "MaxChannelAge";
pub const MAINTENANCE_INTERVAL_KEY: &str = "MaintenanceInterval";
pub const MAX_ACQUIRE_ATTEMPTS_KEY: &str = "MaxAcquireAttempts";
pub const MAINTENANCE_THRESHOLD_KEY: &str = "MaintenanceThreshold";

/// Options for a channel pool.
///
/// # Examples
/// ```rust
/// use eo_access::prelude::*;
/// use std::time::Duration;
///
/// let config = PoolConfig::default()
///     .with_max_size(8)
///     .with_max_wait(Duration::from_millis(250));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on idle + checked-out channels.
    pub max_size: usize,
    /// How long `acquire` blocks on a saturated pool.
    pub max_wait: Duration,
    /// Channels older than this are not handed out and are evicted by maintenance.
    pub max_channel_age: Duration,
    /// Period of the background maintenance sweep.
    pub maintenance_interval: Duration,
    /// Failed connection opens tolerated within one `acquire`.
    pub max_acquire_attempts: u32,
    /// Opens + releases between counter-triggered sweeps.
    pub maintenance_threshold: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 64,
            max_wait: Duration::from_millis(3000),
            max_channel_age: Duration::from_secs(120),
            maintenance_interval: Duration::from_secs(180),
            max_acquire_attempts: 3,
            maintenance_threshold: 64,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    #[must_use]
    pub fn with_max_channel_age(mut self, max_channel_age: Duration) -> Self {
        self.max_channel_age = max_channel_age;
        self
    }

    #[must_use]
    pub fn with_maintenance_interval(mut self, maintenance_interval: Duration) -> Self {
        self.maintenance_interval = maintenance_interval;
        self
    }

    #[must_use]
    pub fn with_max_acquire_attempts(mut self, attempts: u32) -> Self {
        self.max_acquire_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_maintenance_threshold(mut self, threshold: u32) -> Self {
        self.maintenance_threshold = threshold;
        self
    }

    /// Reject configurations the pool cannot run with.
    ///
    /// # Errors
    /// Returns `EoAccessError::ConfigError` naming the offending setting.
    pub fn validate(&self) -> Result<(), EoAccessError> {
        if self.max_size == 0 {
            return Err(EoAccessError::ConfigError(format!(
                "{MAX_POOL_SIZE_KEY} must be at least 1"
            )));
        }
        if self.maintenance_interval.is_zero() {
            return Err(EoAccessError::ConfigError(format!(
                "{MAINTENANCE_INTERVAL_KEY} must be positive"
            )));
        }
        if self.max_acquire_attempts == 0 {
            return Err(EoAccessError::ConfigError(format!(
                "{MAX_ACQUIRE_ATTEMPTS_KEY} must be at least 1"
            )));
        }
        Ok(())
    }

    /// Read pool settings from connection properties, falling back to defaults for absent keys.
    ///
    /// Wait time is in milliseconds; age and interval are in seconds.
    ///
    /// # Errors
    /// Returns `EoAccessError::ConfigError` if a present key does not parse or the result
    /// fails [`PoolConfig::validate`].
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, EoAccessError> {
        let mut config = Self::default();
        if let Some(size) = parse_property::<usize>(properties, MAX_POOL_SIZE_KEY)? {
            config.max_size = size;
        }
        if let Some(ms) = parse_property::<u64>(properties, MAX_CHANNEL_WAIT_TIME_KEY)? {
            config.max_wait = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_property::<u64>(properties, MAX_CHANNEL_AGE_KEY)? {
            config.max_channel_age = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_property::<u64>(properties, MAINTENANCE_INTERVAL_KEY)? {
            config.maintenance_interval = Duration::from_secs(secs);
        }
        if let Some(attempts) = parse_property::<u32>(properties, MAX_ACQUIRE_ATTEMPTS_KEY)? {
            config.max_acquire_attempts = attempts;
        }
        if let Some(threshold) = parse_property::<u32>(properties, MAINTENANCE_THRESHOLD_KEY)? {
            config.maintenance_threshold = threshold;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_property<T: std::str::FromStr>(
    properties: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, EoAccessError> {
    match properties.get(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
            EoAccessError::ConfigError(format!("{key}: cannot parse {raw:?} as a number"))
        }),
    }
}

/// Where a pool connects to, plus its free-form connection properties.
///
/// Typically read from the model file or an application config:
/// ```rust
/// use eo_access::prelude::*;
///
/// let dict: ConnectionDictionary = serde_json::from_str(
///     r#"{ "url": "sqlite::memory:", "properties": { "MaxPoolSize": "4" } }"#,
/// ).unwrap();
/// assert_eq!(dict.pool_config().unwrap().max_size, 4);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionDictionary {
    pub url: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl ConnectionDictionary {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            properties: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// # Errors
    /// See [`PoolConfig::from_properties`].
    pub fn pool_config(&self) -> Result<PoolConfig, EoAccessError> {
        PoolConfig::from_properties(&self.properties)
    }
}
