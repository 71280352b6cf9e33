//! Core traits for the serial driver capability.
//!
//! [`SerialDriver`] acquires ports and [`SerialHandle`] is the opaque capability the
//! self-test drives. Both the tty driver and the mock implement them, so the test
//! procedures never know which one they are talking to.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration parameters for a serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Board connector identifier (e.g. `XSCOM4`).
    pub port_num: String,

    /// Port name as the board labels it (e.g. `UART3`).
    pub name: String,

    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Reserved for driver-specific extras. Unused by the presets.
    pub extra: Option<String>,
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Acquires serial ports.
pub trait SerialDriver: Send + Sync {
    /// Handle type returned on successful acquisition.
    type Handle: SerialHandle + 'static;

    /// Open the port described by `config`.
    ///
    /// Fails with [`PortError::NotFound`] when the port cannot be opened. No handle
    /// exists on failure, so there is nothing to release.
    fn request(&self, config: &SerialConfig) -> Result<Self::Handle, PortError>;
}

/// An open serial port.
///
/// All methods take `&self`: a handle is shared between the thread blocked in
/// [`wait_for_data`](SerialHandle::wait_for_data) and the thread that cancels it.
pub trait SerialHandle: Send + Sync + fmt::Debug {
    /// The configuration the port was opened with.
    fn config(&self) -> &SerialConfig;

    /// Transmit bytes. Returns the number of bytes actually sent.
    fn write(&self, data: &[u8]) -> Result<usize, PortError>;

    /// Block until data is available.
    ///
    /// Returns [`PortError::Interrupted`] when woken by
    /// [`cancel_wait`](SerialHandle::cancel_wait).
    fn wait_for_data(&self) -> Result<(), PortError>;

    /// Read available bytes into `buffer`.
    ///
    /// Returns [`PortError::TryAgain`] when nothing is ready yet.
    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Interrupt any in-progress [`wait_for_data`](SerialHandle::wait_for_data).
    ///
    /// A cancel issued while nobody waits is latched and consumed by the next wait.
    fn cancel_wait(&self) -> Result<(), PortError>;

    /// Release the port. Safe to call more than once.
    fn release(&self);
}
