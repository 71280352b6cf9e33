//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Every section falls back to its defaults, so an empty file is valid.

use super::error::{ConfigError, ConfigResult};
use crate::board::Board;
use crate::platform::{PlatformId, DEFAULT_CPUINFO_PATH, DEFAULT_MODEL_PATH};
use crate::selftest::GateMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform detection
    pub platform: PlatformConfig,
    /// UART name to device node mapping
    pub ports: PortsConfig,
    /// Self-test behaviour
    pub testing: TestingConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.testing.read_timeout_ms == 0 {
            return Err(ConfigError::validation(
                "testing.read_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.testing.cancel_timeout_ms == Some(0) {
            return Err(ConfigError::validation(
                "testing.cancel_timeout_ms",
                "must be greater than zero when set",
            ));
        }
        for (name, device) in &self.ports.devices {
            if device.trim().is_empty() {
                return Err(ConfigError::validation(
                    format!("ports.devices.{name}"),
                    "device path is empty",
                ));
            }
        }
        Ok(())
    }
}

/// Platform detection section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Skip detection and assume this board ("artik5", "artik10", anything else)
    pub force: Option<String>,
    /// Device-tree model file
    pub model_path: PathBuf,
    /// Fallback cpuinfo file
    pub cpuinfo_path: PathBuf,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            force: None,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            cpuinfo_path: PathBuf::from(DEFAULT_CPUINFO_PATH),
        }
    }
}

impl PlatformConfig {
    /// The forced platform, if any.
    pub fn forced(&self) -> Option<PlatformId> {
        self.force.as_deref().map(PlatformId::from_model)
    }
}

/// Port mapping section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    /// UART name (as used by the board presets) to device node
    pub devices: HashMap<String, String>,
}

impl Default for PortsConfig {
    fn default() -> Self {
        let devices = Board::ALL
            .iter()
            .map(|board| {
                (
                    board.serial_config().name,
                    board.default_device().to_string(),
                )
            })
            .collect();
        Self { devices }
    }
}

impl PortsConfig {
    /// Resolve a UART name to its device node, if mapped.
    pub fn device(&self, name: &str) -> Option<&str> {
        self.devices.get(name).map(String::as_str)
    }
}

/// Self-test section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingConfig {
    /// Cancellation gate: "keypress" or "ready"
    pub gate: GateMode,
    /// Bound on the rx worker join after cancelling (unbounded if unset)
    pub cancel_timeout_ms: Option<u64>,
    /// Per-read timeout handed to the tty
    pub read_timeout_ms: u64,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            gate: GateMode::Keypress,
            cancel_timeout_ms: None,
            read_timeout_ms: 1000,
        }
    }
}

impl TestingConfig {
    pub fn cancel_timeout(&self) -> Option<Duration> {
        self.cancel_timeout_ms.map(Duration::from_millis)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error" (RUST_LOG wins)
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    Pretty,
    /// Compact format
    #[default]
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ports.device("UART3"), Some("/dev/ttySAC3"));
        assert_eq!(config.ports.device("UART1"), Some("/dev/ttySAC1"));
        assert_eq!(config.testing.gate, GateMode::Keypress);
        assert_eq!(config.testing.cancel_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [platform]
            force = "artik10"

            [testing]
            gate = "ready"
            cancel_timeout_ms = 2500

            [ports.devices]
            UART1 = "/dev/ttyS1"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.platform.forced(), Some(PlatformId::Artik10));
        assert_eq!(config.testing.gate, GateMode::Ready);
        assert_eq!(config.testing.cancel_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.ports.device("UART1"), Some("/dev/ttyS1"));
        // Defaults should still work
        assert_eq!(config.testing.read_timeout_ms, 1000);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_validation_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.testing.read_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError { key, .. }) if key == "testing.read_timeout_ms"
        ));

        let mut config = Config::default();
        config.testing.cancel_timeout_ms = Some(0);
        assert!(config.validate().is_err());
    }
}
