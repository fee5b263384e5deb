//! Configuration management for courtside
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::portal::headers::DEFAULT_USER_AGENT;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Identity provider and booking portal
    pub portal: PortalConfig,

    /// Booking loop tuning
    pub booking: BookingConfig,

    /// Serving boundary
    pub server: ServerConfig,

    /// Booking notifications
    pub notify: NotifyConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the portal lives and how to talk to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Identity provider base URL
    pub auth_base_url: String,

    /// Booking application base URL
    pub portal_base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            auth_base_url: String::from("https://authserver.szu.edu.cn"),
            portal_base_url: String::from("https://ehall.szu.edu.cn"),
            request_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Booking loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Pause between passes in milliseconds
    pub poll_interval_ms: u64,

    /// A pass is abandoned once more than this many submissions are rejected
    pub max_rejections_per_pass: u32,

    /// JSON file listing the bookable rooms
    pub catalog_path: PathBuf,

    /// Daily start instant for scheduled runs (`HH:MM:SS`, local time)
    pub trigger_time: String,

    /// Extra attempts for transport failures (0 = fail on first error)
    pub transport_retries: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3000,
            max_rejections_per_pass: 2,
            catalog_path: PathBuf::from("badminton.json"),
            trigger_time: String::from("12:29:56"),
            transport_retries: 0,
        }
    }
}

impl BookingConfig {
    /// Parse the trigger time
    pub fn trigger_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.trigger_time, "%H:%M:%S").with_context(|| {
            format!(
                "Invalid trigger_time '{}'. Expected HH:MM:SS",
                self.trigger_time
            )
        })
    }

    /// Pause between passes as Duration
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Serving boundary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: 8080,
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Webhook relaying booking confirmations to the SMS gateway (optional)
    pub webhook_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retry attempts on failure
    pub max_retries: u32,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
            max_retries: 3,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let portal = PortalConfig {
            auth_base_url: std::env::var("COURTSIDE_AUTH_BASE_URL")
                .unwrap_or(defaults.portal.auth_base_url),
            portal_base_url: std::env::var("COURTSIDE_PORTAL_BASE_URL")
                .unwrap_or(defaults.portal.portal_base_url),
            request_timeout_secs: env_parse("COURTSIDE_REQUEST_TIMEOUT")
                .unwrap_or(defaults.portal.request_timeout_secs),
            user_agent: std::env::var("COURTSIDE_USER_AGENT").unwrap_or(defaults.portal.user_agent),
        };

        let booking = BookingConfig {
            poll_interval_ms: env_parse("COURTSIDE_POLL_INTERVAL_MS")
                .unwrap_or(defaults.booking.poll_interval_ms),
            max_rejections_per_pass: env_parse("COURTSIDE_MAX_REJECTIONS")
                .unwrap_or(defaults.booking.max_rejections_per_pass),
            catalog_path: std::env::var("COURTSIDE_CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.booking.catalog_path),
            trigger_time: std::env::var("COURTSIDE_TRIGGER_TIME")
                .unwrap_or(defaults.booking.trigger_time),
            transport_retries: env_parse("COURTSIDE_TRANSPORT_RETRIES")
                .unwrap_or(defaults.booking.transport_retries),
        };

        let server = ServerConfig {
            host: std::env::var("COURTSIDE_HOST").unwrap_or(defaults.server.host),
            port: env_parse("COURTSIDE_PORT").unwrap_or(defaults.server.port),
        };

        let notify = NotifyConfig {
            webhook_url: std::env::var("COURTSIDE_NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            ..defaults.notify
        };

        let logging = LoggingConfig {
            level: std::env::var("COURTSIDE_LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: std::env::var("COURTSIDE_LOG_FORMAT").unwrap_or(defaults.logging.format),
        };

        Ok(Self {
            portal,
            booking,
            server,
            notify,
            logging,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.portal.auth_base_url.trim().is_empty() || self.portal.portal_base_url.trim().is_empty() {
            anyhow::bail!("auth_base_url and portal_base_url must be set");
        }

        if self.portal.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        self.booking.trigger_time()?;

        if let Some(url) = &self.notify.webhook_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("notify.webhook_url must start with http:// or https://");
            }
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.portal.request_timeout_secs)
    }
}
