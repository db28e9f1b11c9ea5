//! Command/response session
//!
//! The device answers every line with free text followed by a `ready>`
//! prompt. The session writes one line, then reads until the prompt shows
//! up or the response window closes. A missing prompt is reported, not
//! treated as an error; I/O failures close the session.

use crate::transport::{Connector, Transport};
use parking_lot::Mutex;
use rppkit_core::{ConnectionError, ConnectionState, DeviceEvent, EventDispatcher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Prompt that acknowledges a command
pub const READY_PROMPT: &str = "ready>";

/// Session timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Wait after opening the port; the device resets on open
    pub settle_delay: Duration,
    /// Window for the prompt after connecting
    pub connect_timeout: Duration,
    /// Response window for manual commands
    pub manual_timeout: Duration,
    /// Response window for streamed lines
    pub stream_timeout: Duration,
    /// Longest single blocking read
    pub read_slice: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            connect_timeout: Duration::from_secs(5),
            manual_timeout: Duration::from_secs(2),
            stream_timeout: Duration::from_secs(3600),
            read_slice: Duration::from_millis(50),
        }
    }
}

/// Result of [`SerialSession::send_line`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The prompt arrived
    Acknowledged,
    /// The response window closed without a prompt
    TimedOut,
}

/// Tears a session down from another thread
///
/// A pending response wait notices the trigger within one read slice.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Single-owner session over one transport
///
/// Not synchronised; callers serialise access.
pub struct SerialSession {
    connector: Arc<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    port: Option<String>,
    state: Arc<Mutex<ConnectionState>>,
    config: SessionConfig,
    events: EventDispatcher,
    shutdown: ShutdownHandle,
    inbound: Vec<u8>,
}

impl SerialSession {
    pub fn new(connector: Arc<dyn Connector>, config: SessionConfig, events: EventDispatcher) -> Self {
        Self {
            connector,
            transport: None,
            port: None,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            config,
            events,
            shutdown: ShutdownHandle::default(),
            inbound: Vec::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Shared view of the connection state, readable while the session is busy
    pub fn state_handle(&self) -> Arc<Mutex<ConnectionState>> {
        Arc::clone(&self.state)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Open `port` and wait for the device prompt
    ///
    /// A missing prompt is logged and the session becomes ready anyway.
    pub fn connect(&mut self, port: &str, baud_rate: u32) -> Result<(), ConnectionError> {
        if let Some(current) = &self.port {
            return Err(ConnectionError::AlreadyConnected {
                port: current.clone(),
            });
        }

        self.shutdown.reset();
        self.inbound.clear();
        self.set_state(ConnectionState::Connecting);

        let transport = match self.connector.open(port, baud_rate) {
            Ok(transport) => transport,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                self.events.error(e.to_string());
                return Err(e);
            }
        };
        self.transport = Some(transport);
        self.port = Some(port.to_string());

        if !self.config.settle_delay.is_zero() {
            std::thread::sleep(self.config.settle_delay);
        }

        // Any line with '>' counts here; firmware banners vary.
        let prompted = self.await_line(self.config.connect_timeout, |line| line.contains('>'))?;
        if !prompted {
            self.events.warn(format!(
                "No prompt received within {} seconds",
                self.config.connect_timeout.as_secs_f64()
            ));
        }

        self.set_state(ConnectionState::Ready);
        self.events
            .info(format!("Connected to {} at {} baud", port, baud_rate));
        Ok(())
    }

    /// Write one line and wait up to `timeout` for the prompt
    pub fn send_line(&mut self, text: &str, timeout: Duration) -> Result<SendOutcome, ConnectionError> {
        self.write_line(text)?;
        self.await_prompt(text, timeout)
    }

    /// Write one line without waiting for the answer
    ///
    /// Refuses to write once the shutdown handle has fired.
    pub fn write_line(&mut self, text: &str) -> Result<(), ConnectionError> {
        if self.shutdown.is_triggered() {
            if self.transport.is_some() {
                self.fail(ConnectionError::Closed);
            }
            return Err(ConnectionError::NotConnected);
        }
        let transport = self.transport.as_mut().ok_or(ConnectionError::NotConnected)?;

        let line = format!("{}\n", text.trim_end());
        if let Err(e) = transport.write(line.as_bytes()) {
            return Err(self.fail(ConnectionError::WriteFailed {
                reason: e.to_string(),
            }));
        }
        self.set_state(ConnectionState::Sending);
        self.events.publish(DeviceEvent::LineSent(text.trim_end().to_string()));
        Ok(())
    }

    /// Wait up to `timeout` for the prompt answering `text`
    pub fn await_prompt(&mut self, text: &str, timeout: Duration) -> Result<SendOutcome, ConnectionError> {
        let acknowledged = self.await_line(timeout, |line| line.contains(READY_PROMPT))?;
        self.set_state(ConnectionState::Ready);
        if acknowledged {
            Ok(SendOutcome::Acknowledged)
        } else {
            self.events.publish(DeviceEvent::PromptTimeout {
                line: text.trim_end().to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
            Ok(SendOutcome::TimedOut)
        }
    }

    /// Close the transport if open
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                tracing::warn!("Error closing {}: {}", transport.name(), e);
            }
            self.events.info("Disconnected");
        }
        self.port = None;
        self.inbound.clear();
        self.set_state(ConnectionState::Disconnected);
    }

    /// Read until a decoded line satisfies `is_prompt` or `timeout` elapses
    fn await_line(
        &mut self,
        timeout: Duration,
        is_prompt: impl Fn(&str) -> bool,
    ) -> Result<bool, ConnectionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.shutdown.is_triggered() {
                return Err(self.fail(ConnectionError::Closed));
            }
            if self.drain_lines(&is_prompt) {
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let slice = self.config.read_slice.min(deadline - now);

            let transport = self.transport.as_mut().ok_or(ConnectionError::NotConnected)?;
            match transport.read(slice) {
                Ok(bytes) => self.inbound.extend_from_slice(&bytes),
                Err(e) => {
                    return Err(self.fail(ConnectionError::ReadFailed {
                        reason: e.to_string(),
                    }))
                }
            }
        }
    }

    /// Publish every complete inbound line; true once a prompt was seen
    ///
    /// A trailing partial line only counts when it is itself a prompt,
    /// since the device does not terminate its prompt.
    fn drain_lines(&mut self, is_prompt: &impl Fn(&str) -> bool) -> bool {
        while let Some(end) = self.inbound.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.inbound.drain(..=end).collect();
            if self.publish_line(&raw[..end]).is_some_and(|line| is_prompt(&line)) {
                return true;
            }
        }

        if !self.inbound.is_empty() {
            if let Ok(partial) = std::str::from_utf8(&self.inbound) {
                if is_prompt(partial) {
                    let raw = std::mem::take(&mut self.inbound);
                    self.publish_line(&raw);
                    return true;
                }
            }
        }
        false
    }

    fn publish_line(&self, raw: &[u8]) -> Option<String> {
        match std::str::from_utf8(raw) {
            Ok(text) => {
                let line = text.trim_end_matches('\r').to_string();
                if !line.is_empty() {
                    self.events.publish(DeviceEvent::LineReceived(line.clone()));
                }
                Some(line)
            }
            Err(_) => {
                self.events.publish(DeviceEvent::Noise(to_hex(raw)));
                None
            }
        }
    }

    /// Close after a fatal error and hand the error back
    fn fail(&mut self, error: ConnectionError) -> ConnectionError {
        if let Some(mut transport) = self.transport.take() {
            let _ = transport.close();
        }
        self.port = None;
        self.inbound.clear();
        self.set_state(ConnectionState::Disconnected);
        match error {
            ConnectionError::Closed => self.events.info("Session closed"),
            _ => self.events.error(error.to_string()),
        }
        error
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.lock();
        if *current != state {
            *current = state;
            self.events.publish(DeviceEvent::Connection(state));
        }
    }
}

impl Drop for SerialSession {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            let _ = transport.close();
        }
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
