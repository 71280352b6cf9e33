//! Mock serial driver for testing.
//!
//! Provides a `MockSerialDriver` that behaves like a board with TX wired to RX,
//! without requiring actual hardware. Reads can be chunked, `TryAgain` results and
//! per-operation failures can be injected, and the blocking wait honours
//! cancellation exactly like the tty driver.

use super::error::PortError;
use super::traits::{SerialConfig, SerialDriver, SerialHandle};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Operations that can be made to fail on the mock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockFaults {
    pub request: bool,
    pub write: bool,
    pub wait: bool,
    pub read: bool,
    pub cancel: bool,
}

/// Inner state of the mock port, shared by the driver and every handle it hands out.
#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes waiting to be read.
    rx_queue: VecDeque<u8>,
    /// Log of all bytes written to the port.
    write_log: Vec<Vec<u8>>,
    /// Feed written bytes back into `rx_queue`.
    loopback: bool,
    /// Upper bound on bytes returned by one read.
    chunk_size: Option<usize>,
    /// Number of `TryAgain` results to hand out before real data.
    try_again: usize,
    /// Upper bound on bytes accepted by one write.
    short_write: Option<usize>,
    /// Index of a looped-back byte to flip.
    corrupt_at: Option<usize>,
    faults: MockFaults,
    cancel_pending: bool,
    waiting: usize,
    requests: usize,
    releases: usize,
    last_config: Option<SerialConfig>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockPortState>,
    data_ready: Condvar,
}

/// Mock serial driver.
///
/// Clones share the same port, so a test can keep one clone for inspection while the
/// self-test owns another.
///
/// # Example
/// ```
/// use uart_selftest::port::{MockSerialDriver, SerialDriver, SerialHandle};
/// use uart_selftest::board::Board;
///
/// let driver = MockSerialDriver::loopback();
/// let handle = driver.request(&Board::Artik5.serial_config()).unwrap();
///
/// handle.write(b"ping").unwrap();
/// handle.wait_for_data().unwrap();
///
/// let mut buffer = [0u8; 8];
/// let n = handle.read(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"ping");
///
/// handle.release();
/// assert_eq!(driver.releases(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockSerialDriver {
    shared: Arc<Shared>,
}

impl MockSerialDriver {
    /// A mock whose reads only return what was enqueued.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock with TX wired to RX.
    pub fn loopback() -> Self {
        let driver = Self::new();
        driver.shared.state.lock().loopback = true;
        driver
    }

    /// Enqueue bytes to be returned by subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.shared.state.lock().rx_queue.extend(data);
        self.shared.data_ready.notify_all();
    }

    /// Limit how many bytes a single read returns.
    pub fn set_chunk_size(&self, chunk_size: usize) {
        self.shared.state.lock().chunk_size = Some(chunk_size.max(1));
    }

    /// Make the next `count` reads return `TryAgain`.
    pub fn inject_try_again(&self, count: usize) {
        self.shared.state.lock().try_again = count;
        self.shared.data_ready.notify_all();
    }

    /// Limit how many bytes a single write accepts.
    pub fn set_short_write(&self, limit: usize) {
        self.shared.state.lock().short_write = Some(limit);
    }

    /// Flip the looped-back byte at `index` of the next write.
    pub fn corrupt_byte(&self, index: usize) {
        self.shared.state.lock().corrupt_at = Some(index);
    }

    pub fn set_faults(&self, faults: MockFaults) {
        self.shared.state.lock().faults = faults;
    }

    /// Get a copy of all data written to the port.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// Number of successful `request` calls.
    pub fn requests(&self) -> usize {
        self.shared.state.lock().requests
    }

    /// Number of handles released. Repeated releases of one handle count once.
    pub fn releases(&self) -> usize {
        self.shared.state.lock().releases
    }

    /// Number of threads currently blocked in `wait_for_data`.
    pub fn waiters(&self) -> usize {
        self.shared.state.lock().waiting
    }

    /// Configuration passed to the most recent successful `request`.
    pub fn last_config(&self) -> Option<SerialConfig> {
        self.shared.state.lock().last_config.clone()
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.shared.state.lock().rx_queue.len()
    }
}

impl SerialDriver for MockSerialDriver {
    type Handle = MockSerialHandle;

    fn request(&self, config: &SerialConfig) -> Result<Self::Handle, PortError> {
        let mut state = self.shared.state.lock();
        if state.faults.request {
            return Err(PortError::not_found(&config.name));
        }
        state.requests += 1;
        state.last_config = Some(config.clone());

        Ok(MockSerialHandle {
            config: config.clone(),
            shared: Arc::clone(&self.shared),
            released: AtomicBool::new(false),
        })
    }
}

/// Handle to the mock port.
#[derive(Debug)]
pub struct MockSerialHandle {
    config: SerialConfig,
    shared: Arc<Shared>,
    released: AtomicBool,
}

impl MockSerialHandle {
    fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

fn injected(op: &str) -> PortError {
    PortError::Io(std::io::Error::other(format!("injected {op} fault")))
}

impl SerialHandle for MockSerialHandle {
    fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();
        if self.is_released() {
            return Err(PortError::NotOpen);
        }
        if state.faults.write {
            return Err(injected("write"));
        }

        let sent = state.short_write.map_or(data.len(), |limit| limit.min(data.len()));
        let sent_bytes = &data[..sent];
        state.write_log.push(sent_bytes.to_vec());

        if state.loopback {
            let mut looped = sent_bytes.to_vec();
            if let Some(index) = state.corrupt_at.take() {
                if let Some(byte) = looped.get_mut(index) {
                    *byte = !*byte;
                }
            }
            state.rx_queue.extend(looped);
            self.shared.data_ready.notify_all();
        }

        Ok(sent)
    }

    fn wait_for_data(&self) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        loop {
            if self.is_released() {
                return Err(PortError::NotOpen);
            }
            if state.cancel_pending {
                state.cancel_pending = false;
                return Err(PortError::Interrupted);
            }
            if state.faults.wait {
                return Err(injected("wait"));
            }
            if !state.rx_queue.is_empty() || state.try_again > 0 {
                return Ok(());
            }

            state.waiting += 1;
            self.shared.data_ready.wait(&mut state);
            state.waiting -= 1;
        }
    }

    fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.shared.state.lock();
        if self.is_released() {
            return Err(PortError::NotOpen);
        }
        if state.faults.read {
            return Err(injected("read"));
        }
        if state.try_again > 0 {
            state.try_again -= 1;
            return Err(PortError::TryAgain);
        }

        let limit = state.chunk_size.unwrap_or(usize::MAX);
        let mut bytes_read = 0;
        for byte in buffer.iter_mut().take(limit) {
            match state.rx_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            Err(PortError::TryAgain)
        } else {
            Ok(bytes_read)
        }
    }

    fn cancel_wait(&self) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        if self.is_released() {
            return Err(PortError::NotOpen);
        }
        if state.faults.cancel {
            return Err(injected("cancel"));
        }
        state.cancel_pending = true;
        self.shared.data_ready.notify_all();
        Ok(())
    }

    fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut state = self.shared.state.lock();
        state.releases += 1;
        self.shared.data_ready.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use std::thread;
    use std::time::{Duration, Instant};

    fn open(driver: &MockSerialDriver) -> MockSerialHandle {
        driver.request(&Board::Artik10.serial_config()).unwrap()
    }

    fn wait_for_waiters(driver: &MockSerialDriver, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while driver.waiters() < count {
            assert!(Instant::now() < deadline, "waiter never blocked");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_loopback_write_then_read() {
        let driver = MockSerialDriver::loopback();
        let handle = open(&driver);

        assert_eq!(handle.write(b"Hello").unwrap(), 5);
        handle.wait_for_data().unwrap();

        let mut buffer = [0u8; 10];
        let n = handle.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"Hello");
        assert_eq!(driver.write_log(), vec![b"Hello".to_vec()]);
    }

    #[test]
    fn test_empty_read_is_try_again() {
        let driver = MockSerialDriver::new();
        let handle = open(&driver);

        let mut buffer = [0u8; 10];
        assert!(matches!(handle.read(&mut buffer), Err(PortError::TryAgain)));
    }

    #[test]
    fn test_chunked_reads() {
        let driver = MockSerialDriver::new();
        driver.enqueue_read(b"Hello, World!");
        driver.set_chunk_size(5);
        let handle = open(&driver);

        let mut buffer = [0u8; 32];
        let n = handle.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"Hello");
        assert_eq!(driver.available_bytes(), 8);
    }

    #[test]
    fn test_injected_try_again_precedes_data() {
        let driver = MockSerialDriver::new();
        driver.enqueue_read(b"x");
        driver.inject_try_again(2);
        let handle = open(&driver);

        let mut buffer = [0u8; 4];
        assert!(handle.read(&mut buffer).unwrap_err().is_try_again());
        assert!(handle.read(&mut buffer).unwrap_err().is_try_again());
        assert_eq!(handle.read(&mut buffer).unwrap(), 1);
    }

    #[test]
    fn test_cancel_unblocks_waiter() {
        let driver = MockSerialDriver::new();
        let handle = Arc::new(open(&driver));

        let waiter = {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.wait_for_data())
        };
        wait_for_waiters(&driver, 1);

        handle.cancel_wait().unwrap();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(PortError::Interrupted)));
    }

    #[test]
    fn test_cancel_before_wait_is_latched() {
        let driver = MockSerialDriver::new();
        let handle = open(&driver);

        handle.cancel_wait().unwrap();
        assert!(matches!(handle.wait_for_data(), Err(PortError::Interrupted)));
    }

    #[test]
    fn test_release_is_idempotent() {
        let driver = MockSerialDriver::loopback();
        let handle = open(&driver);

        handle.release();
        handle.release();
        assert_eq!(driver.releases(), 1);
        assert!(matches!(handle.write(b"x"), Err(PortError::NotOpen)));
    }

    #[test]
    fn test_release_wakes_waiter() {
        let driver = MockSerialDriver::new();
        let handle = Arc::new(open(&driver));

        let waiter = {
            let handle = Arc::clone(&handle);
            thread::spawn(move || handle.wait_for_data())
        };
        wait_for_waiters(&driver, 1);

        handle.release();
        assert!(matches!(waiter.join().unwrap(), Err(PortError::NotOpen)));
    }

    #[test]
    fn test_request_fault() {
        let driver = MockSerialDriver::new();
        driver.set_faults(MockFaults {
            request: true,
            ..Default::default()
        });

        let err = driver.request(&Board::Artik5.serial_config()).unwrap_err();
        assert!(matches!(err, PortError::NotFound(name) if name == "UART3"));
        assert_eq!(driver.requests(), 0);
    }

    #[test]
    fn test_corrupt_byte() {
        let driver = MockSerialDriver::loopback();
        driver.corrupt_byte(1);
        let handle = open(&driver);

        handle.write(b"abc").unwrap();
        let mut buffer = [0u8; 3];
        handle.read(&mut buffer).unwrap();
        assert_eq!(buffer[0], b'a');
        assert_ne!(buffer[1], b'b');
    }
}
