use crate::config::ConfigError;
use crate::port::PortError;
use std::fmt;

/// Unified application error type.
///
/// Procedure failures never end up here: they are reported per procedure and folded
/// into the exit status. This covers what goes wrong around the procedures.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Port(PortError),
    Io(std::io::Error),
    Logging(String),
    Unsupported(&'static str),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Port(e) => write!(f, "A serial port error occurred: {e}"),
            Self::Io(e) => write!(f, "An I/O error occurred: {e}"),
            Self::Logging(details) => write!(f, "Failed to initialise logging: {details}"),
            Self::Unsupported(what) => write!(f, "Not supported on this operating system: {what}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Port(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Logging(_) | Self::Unsupported(_) => None,
        }
    }
}

// Implement `From` conversions to allow the `?` operator to work seamlessly.
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<PortError> for AppError {
    fn from(err: PortError) -> Self {
        AppError::Port(err)
    }
}

impl From<serialport::Error> for AppError {
    fn from(err: serialport::Error) -> Self {
        AppError::Port(PortError::Serial(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}
