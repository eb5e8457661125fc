// Configuration management with layered configuration (file, env)
//
// Horizon, cadence, and payday dates deliberately live here instead of as
// constants: product documentation disagrees on all three, so operators pick
// the interpretation at deploy time.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub weather_api: HttpServiceConfig,
    pub scheduler_api: HttpServiceConfig,
    pub geocoder: HttpServiceConfig,
    pub triggers: TriggerConfig,
    pub retry: RetryConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
}

/// Endpoint + timeout for one of the external HTTP collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServiceConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// How far ahead the hourly forecast is scanned.
    pub forecast_horizon_hours: u32,
    /// Cadence of the weather evaluation path.
    pub weather_poll_interval_hours: u32,
    /// Minimum consecutive qualifying hours for a detection window.
    pub min_consecutive_hours: u32,
    /// Days of month treated as paydays.
    pub payday_days: Vec<u32>,
    /// Local hour at which time-based jobs are dispatched.
    pub dispatch_hour_local: u32,
    /// Forward span within which two jobs of the same category count as
    /// duplicates. Defaults to the forecast horizon.
    pub dedup_horizon_hours: Option<u32>,
}

impl TriggerConfig {
    pub fn dedup_horizon_hours(&self) -> u32 {
        self.dedup_horizon_hours
            .unwrap_or(self.forecast_horizon_hours)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub metrics_port: u16,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment-specific configuration
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }

        if self.weather_api.base_url.is_empty() {
            return Err("Weather API base_url cannot be empty".to_string());
        }
        if self.scheduler_api.base_url.is_empty() {
            return Err("Scheduler API base_url cannot be empty".to_string());
        }
        if self.geocoder.base_url.is_empty() {
            return Err("Geocoder base_url cannot be empty".to_string());
        }

        if self.triggers.forecast_horizon_hours == 0 {
            return Err("forecast_horizon_hours must be greater than 0".to_string());
        }
        if self.triggers.weather_poll_interval_hours == 0 {
            return Err("weather_poll_interval_hours must be greater than 0".to_string());
        }
        if self.triggers.min_consecutive_hours == 0 {
            return Err("min_consecutive_hours must be greater than 0".to_string());
        }
        if self.triggers.min_consecutive_hours > self.triggers.forecast_horizon_hours {
            return Err("min_consecutive_hours cannot exceed forecast_horizon_hours".to_string());
        }
        if self.triggers.payday_days.is_empty() {
            return Err("payday_days cannot be empty".to_string());
        }
        if self
            .triggers
            .payday_days
            .iter()
            .any(|d| !(1..=31).contains(d))
        {
            return Err("payday_days entries must be between 1 and 31".to_string());
        }
        if self.triggers.dispatch_hour_local > 23 {
            return Err("dispatch_hour_local must be between 0 and 23".to_string());
        }

        if self.retry.max_attempts == 0 {
            return Err("retry max_attempts must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/adgen_triggers".to_string(),
                max_connections: 10,
                min_connections: 2,
                connect_timeout_seconds: 30,
            },
            weather_api: HttpServiceConfig {
                base_url: "https://api.open-meteo.com".to_string(),
                timeout_seconds: 10,
            },
            scheduler_api: HttpServiceConfig {
                base_url: "http://localhost:8090".to_string(),
                timeout_seconds: 10,
            },
            geocoder: HttpServiceConfig {
                base_url: "https://geocoding-api.open-meteo.com".to_string(),
                timeout_seconds: 10,
            },
            triggers: TriggerConfig {
                forecast_horizon_hours: 12,
                weather_poll_interval_hours: 3,
                min_consecutive_hours: 2,
                payday_days: vec![1, 15],
                dispatch_hour_local: 10,
                dedup_horizon_hours: None,
            },
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 500,
                max_delay_ms: 5_000,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_port: 9090,
            },
        }
    }
}
