//! Configuration module for uart-selftest.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `--config <path>` on the command line
//! 2. `UART_SELFTEST_CONFIG` environment variable (explicit path)
//! 3. `./uart-selftest.toml` (current directory)
//! 4. `~/.config/uart-selftest/config.toml` (XDG)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `UART_SELFTEST_<SECTION>_<KEY>`
//!
//! Examples:
//! - `UART_SELFTEST_PLATFORM_FORCE=artik10`
//! - `UART_SELFTEST_PLATFORM_CPUINFO_PATH=/tmp/cpuinfo`
//! - `UART_SELFTEST_TESTING_GATE=ready`
//! - `UART_SELFTEST_PORTS_UART3=/dev/ttyS3`
//!
//! # Example
//!
//! ```rust,ignore
//! use uart_selftest::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//! println!("UART3 lives at {:?}", config.ports.device("UART3"));
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig, PlatformConfig, PortsConfig, TestingConfig};
