// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Configuration module for the telemetry service
//!
//! Loads and parses configuration from environment variables and JSON.

use serde::Deserialize;
use std::time::Duration;


/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const SERVER_ADDR: &str = "0.0.0.0:9090";
    pub const ROUTEROS_USERNAME: &str = "admin";
    pub const ROUTEROS_PASSWORD: &str = "";

    pub const MIN_POLLING_INTERVAL: Duration = Duration::from_secs(1);
    pub const MAX_POLLING_INTERVAL: Duration = Duration::from_secs(30);
    pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(5);
    pub const QUEUE_CAPACITY: usize = 10;
    pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Environment variable names used by the application
pub mod env_vars {
    pub const SERVER_ADDR: &str = "SERVER_ADDR";
    pub const ROUTERS_CONFIG: &str = "ROUTERS_CONFIG";
    pub const WATCH_CONFIG: &str = "WATCH_CONFIG";
    pub const MIN_POLLING_INTERVAL: &str = "MIN_POLLING_INTERVAL_SECONDS";
    pub const MAX_POLLING_INTERVAL: &str = "MAX_POLLING_INTERVAL_SECONDS";
    pub const DEFAULT_POLLING_INTERVAL: &str = "DEFAULT_POLLING_INTERVAL_SECONDS";
    pub const QUEUE_CAPACITY: &str = "SUBSCRIBER_QUEUE_CAPACITY";
    pub const FETCH_TIMEOUT: &str = "FETCH_TIMEOUT_SECONDS";
}

/// Configuration for a single MikroTik router
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    pub name: String,
    pub address: String,
    pub username: String,
    pub password: String,
}

impl RouterConfig {
    /// Validates router configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Router name cannot be empty".to_string());
        }

        // Address must contain port
        if !self.address.contains(':') {
            return Err(format!(
                "Invalid address format '{}': expected 'host:port'",
                self.address
            ));
        }

        if self.username.trim().is_empty() {
            return Err(format!(
                "Username cannot be empty for router '{}'",
                self.name
            ));
        }

        Ok(())
    }
}

/// An interface the service keeps a standing subscription on
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    pub router: String,
    pub interface: String,
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl WatchConfig {
    /// Requested interval, falling back to the configured default
    #[must_use]
    pub fn interval(&self, polling: &PollingSettings) -> Duration {
        self.interval_secs
            .map_or(polling.default_interval, Duration::from_secs)
    }

    pub fn validate(&self, routers: &[RouterConfig]) -> Result<(), String> {
        if self.interface.trim().is_empty() {
            return Err(format!(
                "Interface cannot be empty for watch on router '{}'",
                self.router
            ));
        }
        if !routers.iter().any(|r| r.name == self.router) {
            return Err(format!(
                "Watch references unknown router '{}'",
                self.router
            ));
        }
        Ok(())
    }
}

/// Polling limits applied by the subscription registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingSettings {
    /// Floor clamp for requested intervals
    pub min_interval: Duration,
    /// Ceiling clamp for requested intervals
    pub max_interval: Duration,
    /// Interval used when a caller has no preference
    pub default_interval: Duration,
    /// Per-subscriber queue bound
    pub queue_capacity: usize,
    /// Upper bound on a single stats fetch
    pub fetch_timeout: Duration,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            min_interval: defaults::MIN_POLLING_INTERVAL,
            max_interval: defaults::MAX_POLLING_INTERVAL,
            default_interval: defaults::DEFAULT_POLLING_INTERVAL,
            queue_capacity: defaults::QUEUE_CAPACITY,
            fetch_timeout: defaults::FETCH_TIMEOUT,
        }
    }
}

impl PollingSettings {
    /// Clamps a requested interval into `[min_interval, max_interval]`
    #[must_use]
    pub fn clamp(&self, interval: Duration) -> Duration {
        interval.clamp(self.min_interval, self.max_interval)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_interval.is_zero() {
            return Err("Minimum polling interval must be positive".to_string());
        }
        if self.min_interval > self.max_interval {
            return Err(format!(
                "Minimum polling interval {:?} exceeds maximum {:?}",
                self.min_interval, self.max_interval
            ));
        }
        if self.default_interval < self.min_interval || self.default_interval > self.max_interval
        {
            return Err(format!(
                "Default polling interval {:?} outside [{:?}, {:?}]",
                self.default_interval, self.min_interval, self.max_interval
            ));
        }
        if self.queue_capacity == 0 {
            return Err("Subscriber queue capacity must be positive".to_string());
        }
        if self.fetch_timeout.is_zero() {
            return Err("Fetch timeout must be positive".to_string());
        }
        Ok(())
    }

    fn from_env() -> Self {
        let base = Self::default();
        let settings = Self {
            min_interval: env_secs(env_vars::MIN_POLLING_INTERVAL, base.min_interval),
            max_interval: env_secs(env_vars::MAX_POLLING_INTERVAL, base.max_interval),
            default_interval: env_secs(env_vars::DEFAULT_POLLING_INTERVAL, base.default_interval),
            queue_capacity: std::env::var(env_vars::QUEUE_CAPACITY)
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(base.queue_capacity),
            fetch_timeout: env_secs(env_vars::FETCH_TIMEOUT, base.fetch_timeout),
        };

        match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                tracing::error!("Invalid polling settings: {}", e);
                tracing::warn!("Falling back to default polling settings");
                base
            }
        }
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

/// Application-wide configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub routers: Vec<RouterConfig>,
    pub watches: Vec<WatchConfig>,
    pub polling: PollingSettings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: defaults::SERVER_ADDR.to_string(),
            routers: vec![],
            watches: vec![],
            polling: PollingSettings::default(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let server_addr = std::env::var(env_vars::SERVER_ADDR)
            .unwrap_or_else(|_| defaults::SERVER_ADDR.to_string());

        let routers: Vec<RouterConfig> =
            if let Ok(config_json) = std::env::var(env_vars::ROUTERS_CONFIG) {
                serde_json::from_str(&config_json).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse ROUTERS_CONFIG: {}. Using empty list.", e);
                    vec![]
                })
            } else {
                // Legacy single-router variables
                let address = std::env::var("ROUTEROS_ADDRESS").ok();
                let username = std::env::var("ROUTEROS_USERNAME")
                    .unwrap_or_else(|_| defaults::ROUTEROS_USERNAME.to_string());
                let password = std::env::var("ROUTEROS_PASSWORD")
                    .unwrap_or_else(|_| defaults::ROUTEROS_PASSWORD.to_string());

                if let Some(addr) = address {
                    vec![RouterConfig {
                        name: "default".to_string(),
                        address: addr,
                        username,
                        password,
                    }]
                } else {
                    tracing::warn!(
                        "No router configuration found. Service will start without routers."
                    );
                    vec![]
                }
            };

        let routers: Vec<RouterConfig> = routers
            .into_iter()
            .filter(|router| match router.validate() {
                Ok(()) => true,
                Err(e) => {
                    tracing::error!("Invalid router configuration: {}", e);
                    tracing::warn!("Skipping invalid router: {}", router.name);
                    false
                }
            })
            .collect();

        let watches: Vec<WatchConfig> = std::env::var(env_vars::WATCH_CONFIG)
            .ok()
            .map(|json| {
                serde_json::from_str(&json).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse WATCH_CONFIG: {}. Using empty list.", e);
                    vec![]
                })
            })
            .unwrap_or_default();

        let watches = watches
            .into_iter()
            .filter(|watch| match watch.validate(&routers) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Skipping invalid watch: {}", e);
                    false
                }
            })
            .collect();

        Config {
            server_addr,
            routers,
            watches,
            polling: PollingSettings::from_env(),
        }
    }
}
