//! Board tty driver.
//!
//! Opens the UART's device node through the `serialport` crate. Blocking waits poll
//! the tty together with one end of a socket pair; `cancel_wait` writes a byte into
//! the other end, which wakes the poll with [`PortError::Interrupted`].

use super::error::PortError;
use super::traits::{SerialConfig, SerialDriver, SerialHandle};
use parking_lot::Mutex;
use serialport::{SerialPort, TTYPort};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Serial driver backed by the board's tty devices.
#[derive(Debug, Clone)]
pub struct TtySerialDriver {
    /// Port name (`UART3`) to device node (`/dev/ttySAC3`).
    devices: HashMap<String, String>,
    read_timeout: Duration,
}

impl TtySerialDriver {
    pub fn new(devices: HashMap<String, String>, read_timeout: Duration) -> Self {
        Self {
            devices,
            read_timeout,
        }
    }

    /// Device node the driver opens for `config`.
    pub fn device_for(&self, config: &SerialConfig) -> Result<&str, PortError> {
        self.devices
            .get(&config.name)
            .map(String::as_str)
            .ok_or_else(|| PortError::config(format!("no device mapped for {}", config.name)))
    }
}

impl SerialDriver for TtySerialDriver {
    type Handle = TtySerialHandle;

    fn request(&self, config: &SerialConfig) -> Result<Self::Handle, PortError> {
        let device = self.device_for(config)?;
        debug!(port = %config.name, %device, baud = config.baud_rate, "opening tty");

        let port = serialport::new(device, config.baud_rate)
            .data_bits(config.data_bits.into())
            .flow_control(config.flow_control.into())
            .parity(config.parity.into())
            .stop_bits(config.stop_bits.into())
            .timeout(self.read_timeout)
            .open_native()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice
                | serialport::ErrorKind::Io(io::ErrorKind::NotFound) => {
                    PortError::not_found(device)
                }
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        // Stale bytes from a previous run would corrupt the loopback comparison.
        port.clear(serialport::ClearBuffer::All)?;

        let (cancel_tx, cancel_rx) = UnixStream::pair()?;
        cancel_tx.set_nonblocking(true)?;
        cancel_rx.set_nonblocking(true)?;

        Ok(TtySerialHandle {
            config: config.clone(),
            device: device.to_string(),
            tty_fd: port.as_raw_fd(),
            port: Mutex::new(Some(port)),
            cancel_tx,
            cancel_rx,
            released: AtomicBool::new(false),
        })
    }
}

/// Open board UART.
pub struct TtySerialHandle {
    config: SerialConfig,
    device: String,
    tty_fd: RawFd,
    port: Mutex<Option<TTYPort>>,
    cancel_tx: UnixStream,
    cancel_rx: UnixStream,
    released: AtomicBool,
}

impl TtySerialHandle {
    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    fn wake_waiters(&self) -> io::Result<()> {
        match (&self.cancel_tx).write(&[1]) {
            Ok(_) => Ok(()),
            // Socket buffer full: a wake-up is already pending.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn drain_cancel(&self) {
        let mut scratch = [0u8; 16];
        while let Ok(n) = (&self.cancel_rx).read(&mut scratch) {
            if n == 0 {
                break;
            }
        }
    }
}

impl SerialHandle for TtySerialHandle {
    fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut guard = self.port.lock();
        let port = guard.as_mut().ok_or(PortError::NotOpen)?;
        port.write_all(data)?;
        port.flush()?;
        Ok(data.len())
    }

    fn wait_for_data(&self) -> Result<(), PortError> {
        if self.is_released() {
            return Err(PortError::NotOpen);
        }

        let mut fds = [
            libc::pollfd {
                fd: self.tty_fd,
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.cancel_rx.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];

        loop {
            // SAFETY: `fds` is a valid, initialised array that outlives the call.
            let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(PortError::Io(err));
            }

            if fds[1].revents & libc::POLLIN != 0 {
                self.drain_cancel();
                if self.is_released() {
                    return Err(PortError::NotOpen);
                }
                return Err(PortError::Interrupted);
            }
            if fds[0].revents & libc::POLLIN != 0 {
                return Ok(());
            }
            if fds[0].revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
                return Err(PortError::Io(io::Error::other(format!(
                    "{} hung up while waiting",
                    self.device
                ))));
            }
        }
    }

    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut guard = self.port.lock();
        let port = guard.as_mut().ok_or(PortError::NotOpen)?;

        let available = port.bytes_to_read()? as usize;
        if available == 0 || buffer.is_empty() {
            return Err(PortError::TryAgain);
        }

        let want = buffer.len().min(available);
        match port.read(&mut buffer[..want]) {
            Ok(0) => Err(PortError::TryAgain),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Err(PortError::TryAgain)
            }
            Err(e) => Err(PortError::Io(e)),
        }
    }

    fn cancel_wait(&self) -> Result<(), PortError> {
        if self.is_released() {
            return Err(PortError::NotOpen);
        }
        self.wake_waiters().map_err(PortError::Io)
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.wake_waiters() {
            warn!(device = %self.device, "failed to wake waiters on release: {e}");
        }
        if self.port.lock().take().is_some() {
            debug!(device = %self.device, "tty closed");
        }
    }
}

impl Drop for TtySerialHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for TtySerialHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtySerialHandle")
            .field("name", &self.config.name)
            .field("device", &self.device)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Instant;

    fn driver() -> TtySerialDriver {
        let mut devices = HashMap::new();
        devices.insert("UART3".to_string(), "/dev/nonexistent_port_12345".to_string());
        TtySerialDriver::new(devices, Duration::from_millis(100))
    }

    #[test]
    fn test_port_not_found_error() {
        let result = driver().request(&Board::Artik5.serial_config());

        match result {
            Err(PortError::NotFound(name)) => assert!(name.contains("nonexistent")),
            Err(other) => panic!("Expected NotFound error, got: {:?}", other),
            Ok(handle) => panic!("Unexpectedly opened {:?}", handle),
        }
    }

    #[test]
    fn test_unmapped_port_is_config_error() {
        let result = driver().request(&Board::Artik10.serial_config());
        assert!(matches!(result, Err(PortError::Config(msg)) if msg.contains("UART1")));
    }

    /// A pseudo-terminal standing in for the board UART. The slave is kept open
    /// for the lifetime of the test.
    struct Pty {
        master: TTYPort,
        _slave: TTYPort,
        handle: Arc<TtySerialHandle>,
    }

    fn open_pty() -> Pty {
        let (master, slave) = TTYPort::pair().expect("pseudo-terminal pair");
        let path = slave.name().expect("slave pty has a path");

        let mut devices = HashMap::new();
        devices.insert("UART3".to_string(), path);
        let driver = TtySerialDriver::new(devices, Duration::from_millis(100));
        let handle = driver.request(&Board::Artik5.serial_config()).unwrap();

        Pty {
            master,
            _slave: slave,
            handle: Arc::new(handle),
        }
    }

    /// Run `wait_for_data` on another thread, returning its result once it ends.
    fn spawn_waiter(handle: &Arc<TtySerialHandle>) -> mpsc::Receiver<Result<(), PortError>> {
        let (tx, rx) = mpsc::channel();
        let handle = Arc::clone(handle);
        thread::spawn(move || {
            let _ = tx.send(handle.wait_for_data());
        });
        rx
    }

    const WAKE_LIMIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_cancel_interrupts_blocked_wait() {
        let pty = open_pty();
        let waiter = spawn_waiter(&pty.handle);
        thread::sleep(Duration::from_millis(50));

        pty.handle.cancel_wait().unwrap();
        let result = waiter.recv_timeout(WAKE_LIMIT).unwrap();
        assert!(matches!(result, Err(PortError::Interrupted)), "{result:?}");
    }

    #[test]
    fn test_cancel_before_wait_is_latched() {
        let pty = open_pty();
        pty.handle.cancel_wait().unwrap();

        let waiter = spawn_waiter(&pty.handle);
        let result = waiter.recv_timeout(WAKE_LIMIT).unwrap();
        assert!(matches!(result, Err(PortError::Interrupted)), "{result:?}");
    }

    #[test]
    fn test_release_wakes_waiter_and_is_idempotent() {
        let pty = open_pty();
        let waiter = spawn_waiter(&pty.handle);
        thread::sleep(Duration::from_millis(50));

        pty.handle.release();
        let result = waiter.recv_timeout(WAKE_LIMIT).unwrap();
        assert!(matches!(result, Err(PortError::NotOpen)), "{result:?}");

        pty.handle.release();
        assert!(matches!(pty.handle.wait_for_data(), Err(PortError::NotOpen)));
        assert!(matches!(pty.handle.cancel_wait(), Err(PortError::NotOpen)));
        assert!(matches!(pty.handle.write(b"x"), Err(PortError::NotOpen)));
    }

    #[test]
    fn test_incoming_bytes_end_the_wait() {
        let mut pty = open_pty();
        pty.master.write_all(b"hello\0").unwrap();
        pty.master.flush().unwrap();

        pty.handle.wait_for_data().unwrap();

        let mut received = Vec::new();
        let mut buffer = [0u8; 16];
        let deadline = Instant::now() + WAKE_LIMIT;
        while received.len() < 6 && Instant::now() < deadline {
            match pty.handle.read(&mut buffer) {
                Ok(n) => received.extend_from_slice(&buffer[..n]),
                Err(PortError::TryAgain) => thread::sleep(Duration::from_millis(10)),
                Err(e) => panic!("read failed: {e}"),
            }
        }
        assert_eq!(received, b"hello\0");
    }

    #[test]
    fn test_empty_read_is_try_again() {
        let pty = open_pty();
        let mut buffer = [0u8; 8];
        assert!(matches!(pty.handle.read(&mut buffer), Err(PortError::TryAgain)));
    }
}
