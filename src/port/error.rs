//! Port-specific error types.
//!
//! Every driver call reports failure through [`PortError`]. Each variant maps to a
//! stable raw result code (see [`PortError::code`]) which the self-test prints next
//! to its diagnostics.

use thiserror::Error;

/// Raw result code for a successful driver call.
pub const CODE_OK: i32 = 0;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The serial port could not be found or opened.
    #[error("Serial port unavailable: {0}")]
    NotFound(String),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A blocking wait was interrupted by `cancel_wait`.
    #[error("Blocking wait was interrupted")]
    Interrupted,

    /// No data is ready yet. Not a failure; the caller should wait and retry.
    #[error("No data available, try again")]
    TryAgain,

    /// The handle has already been released.
    #[error("Port is not open")]
    NotOpen,

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Raw result code reported in diagnostics.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound(_) => -2,
            Self::Io(_) => -3,
            Self::Config(_) => -4,
            Self::Interrupted => -5,
            Self::TryAgain => -6,
            Self::NotOpen => -7,
            Self::Serial(_) => -8,
        }
    }

    /// Whether this result only means "nothing to read yet".
    pub fn is_try_again(&self) -> bool {
        matches!(self, Self::TryAgain)
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}
