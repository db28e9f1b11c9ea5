//! Scripted in-memory device for protocol tests

#![allow(dead_code)]

use rppkit_communication::{Connector, SessionConfig, Transport};
use rppkit_core::ConnectionError;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the device answers each written line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    /// Echo `ok` and the prompt
    Ready,
    /// Never answer
    Silent,
}

#[derive(Default)]
struct DeviceState {
    inbound: VecDeque<u8>,
    written: Vec<String>,
    open: bool,
    opens: usize,
    fail_writes_after: Option<usize>,
}

/// Mock device shared between the test and the transports it opens
#[derive(Clone)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
    reply: Arc<Mutex<Reply>>,
    greeting: Vec<u8>,
    refuse_open: bool,
}

impl MockDevice {
    pub fn new(reply: Reply) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState::default())),
            reply: Arc::new(Mutex::new(reply)),
            greeting: b"RPP firmware\nready>\n".to_vec(),
            refuse_open: false,
        }
    }

    pub fn with_greeting(mut self, greeting: &[u8]) -> Self {
        self.greeting = greeting.to_vec();
        self
    }

    pub fn refusing() -> Self {
        let mut device = Self::new(Reply::Ready);
        device.refuse_open = true;
        device
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn fail_writes_after(&self, lines: usize) {
        self.state.lock().unwrap().fail_writes_after = Some(lines);
    }

    /// Queue bytes for the session to read
    pub fn push(&self, bytes: &[u8]) {
        self.state.lock().unwrap().inbound.extend(bytes);
    }

    pub fn written(&self) -> Vec<String> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }

    pub fn opens(&self) -> usize {
        self.state.lock().unwrap().opens
    }
}

impl Connector for MockDevice {
    fn open(&self, port: &str, _baud_rate: u32) -> Result<Box<dyn Transport>, ConnectionError> {
        if self.refuse_open {
            return Err(ConnectionError::FailedToOpen {
                port: port.to_string(),
                reason: "No such device".to_string(),
            });
        }
        {
            let mut state = self.state.lock().unwrap();
            state.open = true;
            state.opens += 1;
            state.inbound.extend(self.greeting.iter().copied());
        }
        Ok(Box::new(MockTransport {
            device: self.clone(),
            name: port.to_string(),
        }))
    }
}

struct MockTransport {
    device: MockDevice,
    name: String,
}

impl Transport for MockTransport {
    fn read(&mut self, timeout: Duration) -> io::Result<Vec<u8>> {
        {
            let mut state = self.device.state.lock().unwrap();
            if !state.open {
                return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
            }
            if !state.inbound.is_empty() {
                return Ok(state.inbound.drain(..).collect());
            }
        }
        std::thread::sleep(timeout.min(Duration::from_millis(5)));
        Ok(Vec::new())
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.device.state.lock().unwrap();
        if !state.open {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        if let Some(limit) = state.fail_writes_after {
            if state.written.len() >= limit {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "cable unplugged"));
            }
        }
        let line = String::from_utf8_lossy(data).trim_end().to_string();
        state.written.push(line);
        if *self.device.reply.lock().unwrap() == Reply::Ready {
            state.inbound.extend(b"ok\nready>\n".iter().copied());
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.device.state.lock().unwrap().open = false;
        Ok(())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

/// Session timing scaled down for tests
pub fn fast_config() -> SessionConfig {
    SessionConfig {
        settle_delay: Duration::ZERO,
        connect_timeout: Duration::from_millis(200),
        manual_timeout: Duration::from_millis(100),
        stream_timeout: Duration::from_millis(150),
        read_slice: Duration::from_millis(10),
    }
}
