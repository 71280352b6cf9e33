//! Loopback procedure: what goes out on TX must come back on RX.
//!
//! Requires a wire between the TX and RX pins of the board's test UART.

use super::error::TestFailure;
use super::{report, TestOutcome};
use crate::board::Board;
use crate::port::{SerialDriver, SerialHandle};
use tracing::{debug, trace};

/// Name printed on every diagnostic line of this procedure.
pub const PROCEDURE: &str = "test_serial_loopback";

/// Size of the receive buffer.
pub const MAX_RX_BUF: usize = 64;

/// Message sent through the loop, NUL terminator included.
pub const TEST_MESSAGE: &[u8] = b"This is a test buffer containing test data\0";

/// Run the loopback procedure with [`TEST_MESSAGE`].
pub fn run_loopback<D: SerialDriver>(driver: &D, board: Board) -> TestOutcome {
    run_loopback_with(driver, board, TEST_MESSAGE)
}

/// Run the loopback procedure with an arbitrary message of at most [`MAX_RX_BUF`]
/// bytes.
pub fn run_loopback_with<D: SerialDriver>(driver: &D, board: Board, message: &[u8]) -> TestOutcome {
    println!("TEST: {PROCEDURE}");

    if message.len() > MAX_RX_BUF {
        return report(
            PROCEDURE,
            Err(TestFailure::MessageTooLong {
                len: message.len(),
                capacity: MAX_RX_BUF,
            }),
        );
    }

    let config = board.serial_config();
    let handle = match driver.request(&config) {
        Ok(handle) => handle,
        Err(source) => return report(PROCEDURE, Err(TestFailure::PortUnavailable { source })),
    };
    debug!(?handle, %board, "port acquired");

    let result = exchange(&handle, message);
    handle.release();
    report(PROCEDURE, result)
}

/// Send `message`, then collect it back and compare.
fn exchange<H: SerialHandle + ?Sized>(handle: &H, message: &[u8]) -> Result<(), TestFailure> {
    let sent = handle
        .write(message)
        .map_err(|source| TestFailure::Transmit { source })?;
    if sent != message.len() {
        return Err(TestFailure::ShortWrite {
            sent,
            expected: message.len(),
        });
    }
    debug!(sent, "test data sent");

    let mut rx_buf = [0u8; MAX_RX_BUF];
    let mut read_bytes = 0;
    while read_bytes < sent {
        handle
            .wait_for_data()
            .map_err(|source| TestFailure::Wait { source })?;

        match handle.read(&mut rx_buf[read_bytes..sent]) {
            Ok(n) => {
                read_bytes += n;
                trace!(n, read_bytes, remaining = sent - read_bytes, "rx chunk");
            }
            Err(e) if e.is_try_again() => {
                trace!("read would block, waiting again");
            }
            Err(source) => return Err(TestFailure::Read { source }),
        }
    }

    if rx_buf[..sent] != message[..sent] {
        return Err(TestFailure::mismatch(message, &rx_buf[..sent]));
    }
    Ok(())
}
