//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `housebridge.toml` in the working directory. Every field has a
//! default so the file is optional. Environment variables take precedence
//! over file values.

use std::time::Duration;

use serde::Deserialize;

use housebridge_adapter_mqtt::MqttConfig;
use housebridge_app::coordinator::{ContentionPolicy, CoordinatorConfig};
use housebridge_app::registry::{DEFAULT_CONTROL_TEMPLATE, TopicRegistry};
use housebridge_domain::error::BridgeError;
use housebridge_domain::id::HouseId;
use housebridge_domain::topic::{MappingTarget, TopicMapping, TopicPattern};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Broker connection.
    pub mqtt: MqttConfig,
    /// Control and event tuning.
    pub bridge: BridgeConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Extra topic mappings registered on top of the default schema.
    pub topics: Vec<TopicConfig>,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// What a control request does when another one holds the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Contention {
    #[default]
    Queue,
    Reject,
}

/// Bridge tuning.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Default ack deadline, in milliseconds.
    pub control_timeout_ms: u64,
    pub contention: Contention,
    /// Longest a queued request waits for the device, in milliseconds.
    pub acquire_timeout_ms: Option<u64>,
    /// Command topic template; `{house}`, `{kind}` and `{id}` are filled in.
    pub control_template: String,
    /// Buffered events per SSE subscriber before it starts lagging.
    pub event_capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// One `[[topics]]` entry.
///
/// ```toml
/// [[topics]]
/// pattern = "garage/{id}/climate"
/// target = { type = "sensor_bundle" }
/// house = "h1"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TopicConfig {
    pub pattern: String,
    pub target: MappingTarget,
    /// Fixed house for patterns without a `{house}` placeholder.
    #[serde(default)]
    pub house: Option<String>,
    /// Fixed id for patterns without an `{id}` placeholder.
    #[serde(default)]
    pub id: Option<u32>,
}

impl TopicConfig {
    fn to_mapping(&self) -> Result<TopicMapping, BridgeError> {
        let house = self.house.clone().map(HouseId::new).transpose()?;
        Ok(TopicMapping::new(
            &self.pattern,
            self.target,
            house,
            self.id,
        )?)
    }
}

impl Config {
    /// Load configuration from `housebridge.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("housebridge.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HOUSEBRIDGE_HOST") {
            self.server.host = val;
        }
        if let Some(port) = env_port("HOUSEBRIDGE_PORT") {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("HOUSEBRIDGE_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Ok(val) = std::env::var("HOUSEBRIDGE_MQTT_HOST") {
            self.mqtt.broker_host = val;
        }
        if let Some(port) = env_port("HOUSEBRIDGE_MQTT_PORT") {
            self.mqtt.broker_port = port;
        }
        if let Ok(val) = std::env::var("HOUSEBRIDGE_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.mqtt.broker_port == 0 {
            return Err(ConfigError::Validation(
                "mqtt broker port must be non-zero".to_string(),
            ));
        }
        if self.bridge.control_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "control timeout must be non-zero".to_string(),
            ));
        }
        if self.bridge.event_capacity == 0 {
            return Err(ConfigError::Validation(
                "event capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            contention: match self.bridge.contention {
                Contention::Queue => ContentionPolicy::Queue,
                Contention::Reject => ContentionPolicy::Reject,
            },
            acquire_timeout: self.bridge.acquire_timeout_ms.map(Duration::from_millis),
            control_timeout: Duration::from_millis(self.bridge.control_timeout_ms),
        }
    }

    /// Default schema plus every `[[topics]]` entry, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Topics`] for the first entry that does not
    /// parse or clashes with an earlier one.
    pub fn registry(&self) -> Result<TopicRegistry, ConfigError> {
        let template = TopicPattern::parse(&self.bridge.control_template)
            .map_err(|err| ConfigError::Topics(err.into()))?;
        let registry = TopicRegistry::with_default_schema(template)
            .map_err(|err| ConfigError::Topics(err.into()))?;
        for topic in &self.topics {
            let mapping = topic.to_mapping().map_err(ConfigError::Topics)?;
            registry
                .register(mapping)
                .map_err(|err| ConfigError::Topics(err.into()))?;
        }
        Ok(registry)
    }
}

fn env_port(name: &str) -> Option<u16> {
    std::env::var(name).ok().and_then(|val| val.parse().ok())
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            control_timeout_ms: 5_000,
            contention: Contention::Queue,
            acquire_timeout_ms: None,
            control_template: DEFAULT_CONTROL_TEMPLATE.to_string(),
            event_capacity: 256,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "housebridged=info,housebridge=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// A topic mapping was rejected.
    #[error("invalid topic mapping: {0}")]
    Topics(#[source] BridgeError),
}
