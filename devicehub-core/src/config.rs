use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub broker: BrokerConfig,
    pub stream: StreamConfig,
    pub telemetry: TelemetryConfig,
    pub devices: DeviceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Notification broker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Capacity of the broker's command channel (subscribe/unsubscribe/publish)
    pub command_capacity: usize,
    /// Capacity of every subscriber's delivery queue
    pub subscriber_queue_capacity: usize,
    /// Emit a warning every N drops for the same subscriber
    pub drop_log_interval: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            command_capacity: 4096,
            subscriber_queue_capacity: 16,
            drop_log_interval: 100,
        }
    }
}

/// Server-push stream endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub keep_alive_seconds: u64,
    pub telemetry_event_name: String,
    pub status_event_name: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            keep_alive_seconds: 15,
            telemetry_event_name: "telemetry_new_data".to_string(),
            status_event_name: "device_status".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Window used by history queries without an explicit duration (humantime, e.g. "1h")
    pub default_history_window: String,
    /// Largest window a history query may ask for
    pub max_history_window: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_history_window: "1h".to_string(),
            max_history_window: "7d".to_string(),
        }
    }
}

/// Device registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Reject status reports from devices that were never registered
    pub require_registration: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            require_registration: true,
        }
    }
}

impl TelemetryConfig {
    /// Hard ceiling for `max_history_window` (ten years)
    pub const MAX_HISTORY_WINDOW_LIMIT: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

    pub fn default_history_window(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.default_history_window)
    }

    pub fn max_history_window(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.max_history_window)
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // DEVICEHUB_SERVER__HTTP_PORT, DEVICEHUB_BROKER__SUBSCRIBER_QUEUE_CAPACITY, ...
        builder = builder.add_source(
            Environment::with_prefix("DEVICEHUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Get HTTP address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }

    /// Stream keep-alive interval
    #[must_use]
    pub const fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.stream.keep_alive_seconds)
    }

    /// Validate configuration, collecting every problem instead of stopping at the first
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.http_port == 0 {
            errors.push("server.http_port must be greater than 0".to_string());
        }

        if !matches!(
            self.logging.level.to_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "warning" | "error"
        ) {
            errors.push(format!("logging.level is invalid: {}", self.logging.level));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got {}",
                self.logging.format
            ));
        }

        if self.broker.command_capacity == 0 {
            errors.push("broker.command_capacity must be at least 1".to_string());
        }
        if self.broker.subscriber_queue_capacity == 0 {
            errors.push("broker.subscriber_queue_capacity must be at least 1".to_string());
        }
        if self.broker.drop_log_interval == 0 {
            errors.push("broker.drop_log_interval must be at least 1".to_string());
        }

        if self.stream.keep_alive_seconds == 0 {
            errors.push("stream.keep_alive_seconds must be at least 1".to_string());
        }
        if self.stream.telemetry_event_name.trim().is_empty() {
            errors.push("stream.telemetry_event_name must not be empty".to_string());
        }
        if self.stream.status_event_name.trim().is_empty() {
            errors.push("stream.status_event_name must not be empty".to_string());
        }

        match (
            self.telemetry.default_history_window(),
            self.telemetry.max_history_window(),
        ) {
            (Ok(default), Ok(max)) if default > max => errors.push(format!(
                "telemetry.default_history_window ({}) exceeds telemetry.max_history_window ({})",
                self.telemetry.default_history_window, self.telemetry.max_history_window
            )),
            (Ok(_), Ok(max)) if max > TelemetryConfig::MAX_HISTORY_WINDOW_LIMIT => errors.push(format!(
                "telemetry.max_history_window ({}) must be at most {}",
                self.telemetry.max_history_window,
                humantime::format_duration(TelemetryConfig::MAX_HISTORY_WINDOW_LIMIT)
            )),
            (Ok(_), Ok(_)) => {}
            (default, max) => {
                if let Err(e) = default {
                    errors.push(format!("telemetry.default_history_window is invalid: {e}"));
                }
                if let Err(e) = max {
                    errors.push(format!("telemetry.max_history_window is invalid: {e}"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
