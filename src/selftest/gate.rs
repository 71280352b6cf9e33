//! Gates that hold the cancellation back until the rx worker is blocked.
//!
//! Whatever the gate, the procedure first waits for the worker's readiness signal,
//! so cancellation always follows the start of the wait. The keypress gate adds a
//! human in the loop on top of that for manual runs.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::str::FromStr;

/// How the cancellation procedure decides when to cancel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateMode {
    /// Wait for the space key on the controlling terminal.
    #[default]
    Keypress,
    /// Cancel as soon as the worker reports it is about to block.
    Ready,
}

impl FromStr for GateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keypress" | "key" | "interactive" => Ok(GateMode::Keypress),
            "ready" | "auto" | "unattended" => Ok(GateMode::Ready),
            other => Err(format!("unknown gate mode '{other}' (expected keypress or ready)")),
        }
    }
}

/// Blocks the main flow until cancellation may be issued.
pub trait CancelGate: Send {
    /// Text shown to the operator before the gate blocks, if any.
    fn prompt(&self) -> Option<&str> {
        None
    }

    /// Block until the gate opens.
    fn open(&mut self) -> io::Result<()>;
}

/// Opens immediately; the readiness signal already provides the ordering.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadyGate;

impl CancelGate for ReadyGate {
    fn open(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Waits for a single key on the terminal, echoing anything else typed meanwhile.
#[derive(Debug, Clone, Copy)]
pub struct KeypressGate {
    key: char,
}

impl Default for KeypressGate {
    fn default() -> Self {
        Self { key: ' ' }
    }
}

impl CancelGate for KeypressGate {
    fn prompt(&self) -> Option<&str> {
        Some("press space to cancel the blocking function")
    }

    fn open(&mut self) -> io::Result<()> {
        let _raw = RawModeGuard::enable()?;
        let mut stdout = io::stdout();

        loop {
            let Event::Key(KeyEvent {
                code: KeyCode::Char(c),
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) = event::read()?
            else {
                continue;
            };

            if c == self.key {
                return Ok(());
            }
            if c == 'c' && modifiers.contains(KeyModifiers::CONTROL) {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "aborted by Ctrl+C"));
            }
            write!(stdout, "{c}")?;
            stdout.flush()?;
        }
    }
}

/// Non-canonical terminal input for the lifetime of the guard.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Gate implementing `mode`.
pub fn gate_for(mode: GateMode) -> Box<dyn CancelGate> {
    match mode {
        GateMode::Keypress => Box::new(KeypressGate::default()),
        GateMode::Ready => Box::new(ReadyGate),
    }
}
