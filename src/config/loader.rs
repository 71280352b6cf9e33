//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, PortsConfig};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "UART_SELFTEST";

/// Config file name in the current directory
const LOCAL_CONFIG_FILE_NAME: &str = "uart-selftest.toml";

/// Config file name in the user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory under the user config directory
const APP_DIR_NAME: &str = "uart-selftest";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "UART_SELFTEST_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `UART_SELFTEST_CONFIG` environment variable (explicit path)
    /// 2. `./uart-selftest.toml` (current directory)
    /// 3. `$XDG_CONFIG_HOME/uart-selftest/config.toml` or `~/.config/...`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        // Still apply env overrides even with defaults
        if apply_env_overrides(&mut config).is_err() || config.validate().is_err() {
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. XDG config directory
    if let Some(config_dir) = get_config_dir() {
        let app_config = config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
        if app_config.exists() {
            return Some(app_config);
        }
    }

    // 4. No config file found - will use defaults
    None
}

/// Get the platform-specific config directory.
fn get_config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;

    // A partial [ports.devices] table keeps the board defaults it does not mention.
    for (name, device) in PortsConfig::default().devices {
        config.ports.devices.entry(name).or_insert(device);
    }

    Ok(config)
}

fn env_var(key: &str) -> Option<(String, String)> {
    let var = format!("{ENV_PREFIX}_{key}");
    std::env::var(&var).ok().map(|val| (var, val))
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `UART_SELFTEST_<SECTION>_<KEY>`
/// For example:
/// - `UART_SELFTEST_PLATFORM_FORCE=artik5`
/// - `UART_SELFTEST_PLATFORM_CPUINFO_PATH=/tmp/cpuinfo`
/// - `UART_SELFTEST_TESTING_GATE=ready`
/// - `UART_SELFTEST_PORTS_UART3=/dev/ttyS3`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Platform overrides
    if let Some((_, val)) = env_var("PLATFORM_FORCE") {
        config.platform.force = Some(val);
    }
    if let Some((_, val)) = env_var("PLATFORM_MODEL_PATH") {
        config.platform.model_path = PathBuf::from(val);
    }
    if let Some((_, val)) = env_var("PLATFORM_CPUINFO_PATH") {
        config.platform.cpuinfo_path = PathBuf::from(val);
    }

    // Port overrides, one variable per UART
    let ports_prefix = format!("{ENV_PREFIX}_PORTS_");
    for (key, val) in std::env::vars() {
        if let Some(name) = key.strip_prefix(&ports_prefix) {
            config.ports.devices.insert(name.to_ascii_uppercase(), val);
        }
    }

    // Testing overrides
    if let Some((var, val)) = env_var("TESTING_GATE") {
        config.testing.gate = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(var, e))?;
    }
    if let Some((var, val)) = env_var("TESTING_CANCEL_TIMEOUT_MS") {
        let ms = val
            .parse()
            .map_err(|_| ConfigError::env_parse(var, "Invalid timeout"))?;
        config.testing.cancel_timeout_ms = Some(ms);
    }
    if let Some((var, val)) = env_var("TESTING_READ_TIMEOUT_MS") {
        config.testing.read_timeout_ms = val
            .parse()
            .map_err(|_| ConfigError::env_parse(var, "Invalid timeout"))?;
    }

    // Logging overrides
    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((var, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = val
            .parse()
            .map_err(|e: String| ConfigError::env_parse(var, e))?;
    }

    Ok(())
}
