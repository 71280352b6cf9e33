//! Failure taxonomy for the self-test procedures.

use crate::port::PortError;
use std::io;
use thiserror::Error;

/// Raw code for received bytes that differ from the transmitted ones.
pub const CODE_DATA_MISMATCH: i32 = -10;
/// Raw code for a write that sent fewer bytes than requested.
pub const CODE_SHORT_WRITE: i32 = -11;
/// Raw code for a wait that returned data instead of being interrupted.
pub const CODE_NOT_INTERRUPTED: i32 = -12;
/// Raw code for a worker that panicked or never finished.
pub const CODE_WORKER: i32 = -13;
/// Raw code for a test message larger than the receive buffer.
pub const CODE_MESSAGE_TOO_LONG: i32 = -14;
/// Raw code for a cancellation gate that could not be opened.
pub const CODE_GATE: i32 = -15;

/// Why a procedure failed. Driver-level causes keep the underlying [`PortError`].
#[derive(Debug, Error)]
pub enum TestFailure {
    #[error("failed to request serial port: {source}")]
    PortUnavailable { source: PortError },

    #[error("failed to send data: {source}")]
    Transmit { source: PortError },

    #[error("sent only {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },

    #[error("message of {len} bytes does not fit the {capacity}-byte receive buffer")]
    MessageTooLong { len: usize, capacity: usize },

    #[error("failed while waiting for RX data: {source}")]
    Wait { source: PortError },

    #[error("failed to read data: {source}")]
    Read { source: PortError },

    #[error("failed. Tx and Rx data don't match ({sent_text} != {received_text})")]
    DataMismatch {
        sent: Vec<u8>,
        received: Vec<u8>,
        sent_text: String,
        received_text: String,
    },

    #[error("failed to cancel blocking call: {source}")]
    Cancel { source: PortError },

    #[error("blocking wait ended without being interrupted: {source}")]
    NotInterrupted { source: PortError },

    #[error("blocking wait returned data instead of being interrupted")]
    WaitReturnedData,

    #[error("cancel gate failed, cancelled without it: {source}")]
    Gate { source: io::Error },

    #[error("rx worker failed: {0}")]
    Worker(String),
}

impl TestFailure {
    /// Build a mismatch failure, rendering both buffers for the diagnostic line.
    pub fn mismatch(sent: &[u8], received: &[u8]) -> Self {
        Self::DataMismatch {
            sent_text: printable(sent),
            received_text: printable(received),
            sent: sent.to_vec(),
            received: received.to_vec(),
        }
    }

    /// Raw result code reported next to the diagnostic.
    pub fn code(&self) -> i32 {
        match self {
            Self::PortUnavailable { source }
            | Self::Transmit { source }
            | Self::Wait { source }
            | Self::Read { source }
            | Self::Cancel { source }
            | Self::NotInterrupted { source } => source.code(),
            Self::ShortWrite { .. } => CODE_SHORT_WRITE,
            Self::MessageTooLong { .. } => CODE_MESSAGE_TOO_LONG,
            Self::DataMismatch { .. } => CODE_DATA_MISMATCH,
            Self::WaitReturnedData => CODE_NOT_INTERRUPTED,
            Self::Gate { .. } => CODE_GATE,
            Self::Worker(_) => CODE_WORKER,
        }
    }
}

/// Text up to the first NUL, with non-printable bytes escaped.
fn printable(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    bytes[..end].escape_ascii().to_string()
}
