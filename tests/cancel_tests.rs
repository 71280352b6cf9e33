//! Cancellation procedure against the mock driver.

mod common;

use common::{wait_for_waiters, TEST_DEADLINE};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uart_selftest::port::{MockFaults, MockSerialDriver, PortError, SerialDriver, SerialHandle};
use uart_selftest::selftest::error::CODE_GATE;
use uart_selftest::selftest::{run_cancel, CancelGate, ReadyGate, TestFailure};
use uart_selftest::Board;

/// Opens only once the rx worker is provably blocked in the driver.
struct BlockedWorkerGate {
    driver: MockSerialDriver,
    saw_waiter: Arc<AtomicBool>,
}

impl CancelGate for BlockedWorkerGate {
    fn open(&mut self) -> io::Result<()> {
        wait_for_waiters(&self.driver, 1);
        self.saw_waiter.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct BrokenGate;

impl CancelGate for BrokenGate {
    fn open(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"))
    }
}

#[tokio::test]
async fn test_cancel_interrupts_blocked_worker() {
    let driver = MockSerialDriver::new();
    let saw_waiter = Arc::new(AtomicBool::new(false));
    let gate = BlockedWorkerGate {
        driver: driver.clone(),
        saw_waiter: Arc::clone(&saw_waiter),
    };

    let outcome = run_cancel(&driver, Board::Artik5, Box::new(gate), Some(TEST_DEADLINE)).await;

    assert!(outcome.is_success(), "{outcome:?}");
    assert!(saw_waiter.load(Ordering::SeqCst));
    assert_eq!(driver.waiters(), 0);
    assert_eq!(driver.releases(), 1);
}

#[tokio::test]
async fn test_cancel_completes_within_bound() {
    let driver = MockSerialDriver::new();
    let started = Instant::now();

    let outcome = tokio::time::timeout(
        TEST_DEADLINE,
        run_cancel(&driver, Board::Artik10, Box::new(ReadyGate), Some(TEST_DEADLINE)),
    )
    .await
    .expect("cancellation procedure hung");

    assert!(outcome.is_success(), "{outcome:?}");
    assert!(started.elapsed() < TEST_DEADLINE);
}

#[tokio::test]
async fn test_gate_error_cancels_then_fails() {
    let driver = MockSerialDriver::new();
    let outcome = run_cancel(&driver, Board::Artik5, Box::new(BrokenGate), Some(TEST_DEADLINE)).await;

    match outcome.failure() {
        Some(failure @ TestFailure::Gate { source }) => {
            assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof);
            assert_eq!(failure.code(), CODE_GATE);
        }
        other => panic!("expected gate failure, got {other:?}"),
    }
    assert_eq!(driver.releases(), 1);
    assert_eq!(driver.waiters(), 0);
}

#[tokio::test]
async fn test_request_failure_has_nothing_to_release() {
    let driver = MockSerialDriver::new();
    driver.set_faults(MockFaults {
        request: true,
        ..Default::default()
    });

    let outcome = run_cancel(&driver, Board::Artik5, Box::new(ReadyGate), Some(TEST_DEADLINE)).await;
    assert!(matches!(
        outcome.failure(),
        Some(TestFailure::PortUnavailable { .. })
    ));
    assert_eq!(driver.releases(), 0);
}

#[tokio::test]
async fn test_wait_failure_is_not_an_interruption() {
    let driver = MockSerialDriver::new();
    driver.set_faults(MockFaults {
        wait: true,
        ..Default::default()
    });

    let outcome = run_cancel(&driver, Board::Artik10, Box::new(ReadyGate), Some(TEST_DEADLINE)).await;
    match outcome.failure() {
        Some(TestFailure::NotInterrupted { source }) => {
            assert!(matches!(source, PortError::Io(_)));
        }
        other => panic!("expected NotInterrupted, got {other:?}"),
    }
    assert_eq!(driver.releases(), 1);
}

#[test]
fn test_cancel_from_another_thread() {
    let driver = MockSerialDriver::new();
    let handle = Arc::new(driver.request(&Board::Artik5.serial_config()).unwrap());

    let waiter = {
        let handle = Arc::clone(&handle);
        std::thread::spawn(move || handle.wait_for_data())
    };
    wait_for_waiters(&driver, 1);

    let cancelled_at = Instant::now();
    handle.cancel_wait().unwrap();
    let result = waiter.join().unwrap();

    assert!(matches!(result, Err(PortError::Interrupted)));
    assert!(cancelled_at.elapsed() < TEST_DEADLINE);
    handle.release();
    handle.release();
    assert_eq!(driver.releases(), 1);
}
