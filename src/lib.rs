//! UART Self-Test Library
//!
//! Loopback and blocking-wait cancellation checks for the UARTs of ARTIK 5 and
//! ARTIK 10 development boards.
//!
//! # Modules
//!
//! - `board`: Supported boards and their UART presets
//! - `platform`: Platform identification and capability discovery
//! - `port`: Serial driver capability, tty driver and mock
//! - `selftest`: Loopback and cancellation procedures and the runner
//! - `config`: Configuration management with TOML support
//! - `logging`: Tracing subscriber setup
//! - `error`: Unified error handling

pub mod board;
pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod port;
pub mod selftest;

// Re-export commonly used types for convenience
pub use board::Board;
pub use error::AppError;
pub use platform::{Capability, FixedProbe, PlatformId, PlatformProbe, SysfsProbe};
pub use port::{
    DataBits, FlowControl, MockFaults, MockSerialDriver, Parity, PortError, SerialConfig,
    SerialDriver, SerialHandle, StopBits,
};
pub use selftest::{
    GateMode, RunOptions, RunReport, SelfTest, TestFailure, TestOutcome, STATUS_FAILURE,
    STATUS_OK,
};

#[cfg(unix)]
pub use port::{TtySerialDriver, TtySerialHandle};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
