//! Supported boards and their UART presets.
//!
//! The loopback wire sits between TX and RX of:
//! - ARTIK 5: connector J26, `UART3` (`XSCOM4`)
//! - ARTIK 10: `UART1` (`XSCOM2`)

use crate::port::{DataBits, FlowControl, Parity, SerialConfig, StopBits};
use std::fmt;

/// Baud rate used by both presets.
pub const PRESET_BAUD: u32 = 115_200;

/// A development board the self-test knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Board {
    Artik5,
    Artik10,
}

impl Board {
    pub const ALL: [Board; 2] = [Board::Artik5, Board::Artik10];

    /// Serial configuration for this board's loopback UART.
    ///
    /// Built fresh on every call.
    pub fn serial_config(self) -> SerialConfig {
        let (port_num, name) = match self {
            Board::Artik5 => ("XSCOM4", "UART3"),
            Board::Artik10 => ("XSCOM2", "UART1"),
        };

        SerialConfig {
            port_num: port_num.to_string(),
            name: name.to_string(),
            baud_rate: PRESET_BAUD,
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            extra: None,
        }
    }

    /// Device node the board's kernel exposes for the loopback UART.
    pub fn default_device(self) -> &'static str {
        match self {
            Board::Artik5 => "/dev/ttySAC3",
            Board::Artik10 => "/dev/ttySAC1",
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Board::Artik5 => write!(f, "ARTIK 5"),
            Board::Artik10 => write!(f, "ARTIK 10"),
        }
    }
}
