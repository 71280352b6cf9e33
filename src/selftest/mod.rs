//! Self-test runner.
//!
//! Detects the platform, checks that a serial subsystem exists, and runs the
//! loopback and cancellation procedures against the board's UART preset.
//!
//! ```text
//! PlatformProbe ──> board preset ──> loopback ──┐
//!                                  └─> cancel ──┴──> RunReport ──> exit status
//! ```

pub mod cancel;
pub mod error;
pub mod gate;
pub mod loopback;

pub use cancel::run_cancel;
pub use error::TestFailure;
pub use gate::{gate_for, CancelGate, GateMode, KeypressGate, ReadyGate};
pub use loopback::{run_loopback, run_loopback_with, MAX_RX_BUF, TEST_MESSAGE};

use crate::board::Board;
use crate::platform::{Capability, PlatformId, PlatformProbe};
use crate::port::SerialDriver;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};

/// Process status for a fully successful run.
pub const STATUS_OK: i32 = 0;
/// Process status for any failure, and for the skip path.
pub const STATUS_FAILURE: i32 = -1;

/// Result of one procedure.
#[derive(Debug)]
pub enum TestOutcome {
    Success,
    Failure(TestFailure),
}

impl TestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TestOutcome::Success)
    }

    pub fn failure(&self) -> Option<&TestFailure> {
        match self {
            TestOutcome::Success => None,
            TestOutcome::Failure(failure) => Some(failure),
        }
    }
}

impl From<Result<(), TestFailure>> for TestOutcome {
    fn from(result: Result<(), TestFailure>) -> Self {
        match result {
            Ok(()) => TestOutcome::Success,
            Err(failure) => TestOutcome::Failure(failure),
        }
    }
}

/// Print the verdict line for `procedure` and turn `result` into an outcome.
pub(crate) fn report(procedure: &str, result: Result<(), TestFailure>) -> TestOutcome {
    match &result {
        Ok(()) => println!("TEST: {procedure} succeeded"),
        Err(failure) => {
            eprintln!("TEST: {procedure} {failure} ({})", failure.code());
            debug!(procedure, code = failure.code(), ?failure, "procedure failed");
        }
    }
    result.into()
}

/// Which procedures to run and how.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub gate: GateMode,
    /// Bound on joining the rx worker after cancellation.
    pub join_timeout: Option<Duration>,
    pub loopback: bool,
    pub cancel: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            gate: GateMode::Keypress,
            join_timeout: None,
            loopback: true,
            cancel: true,
        }
    }
}

/// What a run did.
#[derive(Debug)]
pub enum RunReport {
    /// The platform has no serial subsystem; nothing was attempted.
    Skipped,
    /// The platform is not one of the supported boards; nothing was attempted.
    Unsupported(PlatformId),
    Ran {
        board: Board,
        loopback: Option<TestOutcome>,
        cancel: Option<TestOutcome>,
    },
}

impl RunReport {
    /// Process status: failure if any procedure that ran failed.
    pub fn status(&self) -> i32 {
        match self {
            RunReport::Skipped => STATUS_FAILURE,
            RunReport::Unsupported(_) => STATUS_OK,
            RunReport::Ran {
                loopback, cancel, ..
            } => {
                let all_passed = [loopback, cancel]
                    .into_iter()
                    .flatten()
                    .all(TestOutcome::is_success);
                if all_passed {
                    STATUS_OK
                } else {
                    STATUS_FAILURE
                }
            }
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        // -1 surfaces as 255, as a C `return -1` from main would.
        ExitCode::from(self.status() as u8)
    }
}

/// The self-test, wired to a platform probe and a serial driver.
#[derive(Debug)]
pub struct SelfTest<P, D> {
    probe: P,
    driver: D,
    options: RunOptions,
}

impl<P: PlatformProbe, D: SerialDriver> SelfTest<P, D> {
    pub fn new(probe: P, driver: D, options: RunOptions) -> Self {
        Self {
            probe,
            driver,
            options,
        }
    }

    /// Run every selected procedure.
    ///
    /// The cancellation procedure runs even when the loopback failed.
    pub async fn run(&self) -> RunReport {
        let platform = self.probe.detect_platform();
        info!(%platform, "platform detected");

        if !self.probe.is_capability_available(Capability::Serial) {
            println!("TEST: Serial module is not available, skipping test...");
            return RunReport::Skipped;
        }

        let Some(board) = platform.board() else {
            info!(%platform, "no UART preset for this platform, nothing to test");
            return RunReport::Unsupported(platform);
        };

        let loopback = self
            .options
            .loopback
            .then(|| run_loopback(&self.driver, board));

        let cancel = if self.options.cancel {
            let gate = gate_for(self.options.gate);
            Some(run_cancel(&self.driver, board, gate, self.options.join_timeout).await)
        } else {
            None
        };

        RunReport::Ran {
            board,
            loopback,
            cancel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed() -> TestOutcome {
        TestOutcome::Failure(TestFailure::WaitReturnedData)
    }

    #[test]
    fn test_status_aggregates_both_procedures() {
        let report = RunReport::Ran {
            board: Board::Artik5,
            loopback: Some(failed()),
            cancel: Some(TestOutcome::Success),
        };
        assert_eq!(report.status(), STATUS_FAILURE);

        let report = RunReport::Ran {
            board: Board::Artik5,
            loopback: Some(TestOutcome::Success),
            cancel: Some(TestOutcome::Success),
        };
        assert_eq!(report.status(), STATUS_OK);
    }

    #[test]
    fn test_status_for_skips() {
        assert_eq!(RunReport::Skipped.status(), STATUS_FAILURE);
        assert_eq!(
            RunReport::Unsupported(PlatformId::Other("pc".into())).status(),
            STATUS_OK
        );
    }

    #[test]
    fn test_unselected_procedures_do_not_count() {
        let report = RunReport::Ran {
            board: Board::Artik10,
            loopback: None,
            cancel: Some(TestOutcome::Success),
        };
        assert_eq!(report.status(), STATUS_OK);
    }
}
