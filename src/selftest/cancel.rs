//! Cancellation procedure: a blocking wait must yield to `cancel_wait`.
//!
//! One rx worker blocks in `wait_for_data` on a shared handle. Once the gate opens
//! the main flow cancels the wait, joins the worker and only then releases the
//! handle.

use super::error::TestFailure;
use super::gate::CancelGate;
use super::{report, TestOutcome};
use crate::board::Board;
use crate::port::{PortError, SerialDriver, SerialHandle};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Name printed on every diagnostic line of this procedure.
pub const PROCEDURE: &str = "test_serial_cancel";

const WORKER: &str = "rx_wait";

/// Run the cancellation procedure.
///
/// `join_timeout` bounds how long the worker may take to finish after the
/// cancellation was issued; `None` waits indefinitely.
pub async fn run_cancel<D: SerialDriver>(
    driver: &D,
    board: Board,
    gate: Box<dyn CancelGate>,
    join_timeout: Option<Duration>,
) -> TestOutcome {
    println!("TEST: {PROCEDURE}");

    let config = board.serial_config();
    let handle = match driver.request(&config) {
        Ok(handle) => Arc::new(handle),
        Err(source) => return report(PROCEDURE, Err(TestFailure::PortUnavailable { source })),
    };
    debug!(?handle, %board, "port acquired");

    let (ready_tx, ready_rx) = oneshot::channel();
    let worker = {
        let handle = Arc::clone(&handle);
        tokio::task::spawn_blocking(move || rx_wait(&*handle, ready_tx))
    };

    let result = cancel_and_join(&*handle, worker, ready_rx, gate, join_timeout).await;
    handle.release();
    report(PROCEDURE, result)
}

/// Worker body: announce readiness, then block until something wakes us.
fn rx_wait<H: SerialHandle + ?Sized>(
    handle: &H,
    ready: oneshot::Sender<()>,
) -> Result<(), PortError> {
    // A cancel that lands between this signal and the wait is latched by the driver.
    let _ = ready.send(());

    let result = handle.wait_for_data();
    match &result {
        Err(PortError::Interrupted) => {
            println!("TEST: {WORKER} Rx blocking wait was interrupted");
        }
        Err(e) => {
            eprintln!("TEST: {WORKER} failed while waiting for RX data ({})", e.code());
        }
        Ok(()) => {
            eprintln!("TEST: {WORKER} received data instead of being interrupted");
        }
    }
    result
}

async fn cancel_and_join<H: SerialHandle + ?Sized>(
    handle: &H,
    worker: JoinHandle<Result<(), PortError>>,
    ready: oneshot::Receiver<()>,
    mut gate: Box<dyn CancelGate>,
    join_timeout: Option<Duration>,
) -> Result<(), TestFailure> {
    if ready.await.is_err() {
        // Sender dropped without signalling: the worker died before waiting.
        let exited = join_worker(worker, join_timeout).await?;
        return Err(TestFailure::Worker(format!(
            "rx worker exited before waiting ({exited:?})"
        )));
    }
    debug!("rx worker is waiting");

    if let Some(prompt) = gate.prompt() {
        println!("TEST: {PROCEDURE} - {prompt}");
    }
    let gate_result = match tokio::task::spawn_blocking(move || gate.open()).await {
        Ok(result) => result,
        Err(e) => Err(io::Error::other(format!("cancel gate panicked: {e}"))),
    };
    if let Err(e) = &gate_result {
        // The worker is blocked either way; cancel it so the handle can be released.
        warn!("cancel gate failed, cancelling without it: {e}");
    }

    if let Err(source) = handle.cancel_wait() {
        // The worker is still blocked; releasing wakes it so the join terminates.
        handle.release();
        if let Err(e) = join_worker(worker, join_timeout).await {
            warn!("rx worker did not stop after release: {e}");
        }
        return Err(TestFailure::Cancel { source });
    }
    debug!("cancellation issued");

    match join_worker(worker, join_timeout).await? {
        Err(PortError::Interrupted) => gate_result.map_err(|source| TestFailure::Gate { source }),
        Err(source) => Err(TestFailure::NotInterrupted { source }),
        Ok(()) => Err(TestFailure::WaitReturnedData),
    }
}

async fn join_worker(
    worker: JoinHandle<Result<(), PortError>>,
    join_timeout: Option<Duration>,
) -> Result<Result<(), PortError>, TestFailure> {
    let joined = match join_timeout {
        Some(limit) => tokio::time::timeout(limit, worker).await.map_err(|_| {
            TestFailure::Worker(format!("rx worker still blocked after {limit:?}"))
        })?,
        None => worker.await,
    };
    joined.map_err(|e| TestFailure::Worker(e.to_string()))
}
