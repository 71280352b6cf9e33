//! Shared test utilities for the self-test integration tests.
//!
//! This module provides:
//! - Mock driver builders with loopback wiring and injected faults
//! - Probes for supported and unsupported platforms
//! - Helpers to wait for a blocked rx worker

#![allow(dead_code)]

use std::thread;
use std::time::{Duration, Instant};
use uart_selftest::platform::{Capability, FixedProbe, PlatformId};
use uart_selftest::port::{MockFaults, MockSerialDriver};
use uart_selftest::selftest::{GateMode, RunOptions};
use uart_selftest::Board;

/// Upper bound for anything a test waits on.
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

/// A loopback mock that returns at most `chunk` bytes per read.
pub fn chunked_loopback(chunk: usize) -> MockSerialDriver {
    let driver = MockSerialDriver::loopback();
    driver.set_chunk_size(chunk);
    driver
}

/// A loopback mock with one operation failing.
pub fn faulty_loopback(faults: MockFaults) -> MockSerialDriver {
    let driver = MockSerialDriver::loopback();
    driver.set_faults(faults);
    driver
}

/// Probe for a supported board.
pub fn board_probe(board: Board) -> FixedProbe {
    FixedProbe::board(board)
}

/// Probe for a platform without a serial subsystem.
pub fn serial_less_probe(board: Board) -> FixedProbe {
    FixedProbe::new(board.into(), &[Capability::Gpio])
}

/// Probe for a platform the self-test has no preset for.
pub fn unknown_board_probe() -> FixedProbe {
    FixedProbe::new(
        PlatformId::Other("Raspberry Pi 4 Model B".to_string()),
        &[Capability::Serial],
    )
}

/// Unattended options with a join bound, both procedures selected.
pub fn unattended() -> RunOptions {
    RunOptions {
        gate: GateMode::Ready,
        join_timeout: Some(TEST_DEADLINE),
        ..RunOptions::default()
    }
}

/// Block until `count` threads wait on the mock, panicking after [`TEST_DEADLINE`].
pub fn wait_for_waiters(driver: &MockSerialDriver, count: usize) {
    let deadline = Instant::now() + TEST_DEADLINE;
    while driver.waiters() < count {
        assert!(Instant::now() < deadline, "no thread blocked in wait_for_data");
        thread::sleep(Duration::from_millis(1));
    }
}
