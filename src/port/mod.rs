//! Port abstraction layer for serial communication.
//!
//! The self-test only sees the [`SerialDriver`] / [`SerialHandle`] capability. The
//! tty driver talks to real hardware; the mock stands in for it in tests.

pub mod error;
pub mod mock;
pub mod traits;

#[cfg(unix)]
pub mod sync_port;

pub use error::{PortError, CODE_OK};
pub use mock::{MockFaults, MockSerialDriver, MockSerialHandle};
pub use traits::*;

#[cfg(unix)]
pub use sync_port::{TtySerialDriver, TtySerialHandle};
