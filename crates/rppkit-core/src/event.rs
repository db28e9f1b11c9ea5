//! Event channel between the motion core and its consumer
//!
//! Provides:
//! - Event types for log lines, wire traffic, positions and job progress
//! - An event dispatcher that many producers clone and one consumer drains
//!
//! Events are delivered in the order they were published. Every published
//! event is mirrored to `tracing` so headless runs keep a complete log.

use crate::data::{CartesianPosition, ConnectionState, JobId, JobState, JointState};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// Per-line chatter
    Debug,
    /// Lifecycle information
    Info,
    /// Recoverable problem (timeout, skipped line, bounds violation)
    Warn,
    /// Fatal problem for the current operation
    Error,
}

/// Events published by the session, kinematics model and stream controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceEvent {
    /// Free-form log line
    Log {
        /// Severity
        level: LogLevel,
        /// Message text
        message: String,
    },
    /// Connection state changed
    Connection(ConnectionState),
    /// A line was written to the device
    LineSent(String),
    /// A decoded line was received from the device
    LineReceived(String),
    /// Bytes that did not decode as UTF-8, hex encoded
    Noise(String),
    /// No prompt arrived within the response window
    PromptTimeout {
        /// The line that went unanswered
        line: String,
        /// Response window in milliseconds
        timeout_ms: u64,
    },
    /// Model position after applying a command
    Position {
        /// Joint coordinates
        joints: JointState,
        /// End effector position
        position: CartesianPosition,
    },
    /// Streaming progress
    Progress {
        /// Lines sent so far
        sent: usize,
        /// Lines in the job
        total: usize,
    },
    /// Streaming job changed state
    JobStateChanged {
        /// Job identifier
        job: JobId,
        /// New state
        state: JobState,
    },
    /// Every line of a job was sent
    JobComplete {
        /// Job identifier
        job: JobId,
        /// Lines sent
        sent: usize,
        /// Lines that timed out waiting for a prompt
        timeouts: usize,
    },
}

impl std::fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceEvent::Log { message, .. } => write!(f, "{}", message),
            DeviceEvent::Connection(state) => write!(f, "Connection: {}", state),
            DeviceEvent::LineSent(line) => write!(f, "Sending: {}", line),
            DeviceEvent::LineReceived(line) => write!(f, "Received: {}", line),
            DeviceEvent::Noise(hex) => write!(f, "Decode error: {}", hex),
            DeviceEvent::PromptTimeout { line, timeout_ms } => {
                write!(f, "No prompt received for '{}' within {}ms", line, timeout_ms)
            }
            DeviceEvent::Position { joints, position } => {
                write!(f, "Position: {} ({})", position, joints)
            }
            DeviceEvent::Progress { sent, total } => write!(f, "Progress: {}/{}", sent, total),
            DeviceEvent::JobStateChanged { job, state } => write!(f, "{}: {}", job, state),
            DeviceEvent::JobComplete {
                job,
                sent,
                timeouts,
            } => write!(
                f,
                "{} complete: {} lines sent, {} timeouts",
                job, sent, timeouts
            ),
        }
    }
}

/// Event dispatcher for publishing events to the consumer
///
/// Cloning the dispatcher adds a producer; the receiver returned by
/// [`EventDispatcher::channel`] is the single consumer.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    /// Sender half of the event channel.
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl EventDispatcher {
    /// Create a dispatcher and its consumer
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DeviceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Create a dispatcher whose events only reach `tracing`
    pub fn detached() -> Self {
        let (dispatcher, _) = Self::channel();
        dispatcher
    }

    /// Publish an event
    ///
    /// Returns false when the consumer has gone away. Publishing never blocks.
    pub fn publish(&self, event: DeviceEvent) -> bool {
        match &event {
            DeviceEvent::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
            DeviceEvent::Noise(_) | DeviceEvent::PromptTimeout { .. } => {
                tracing::warn!("{}", event)
            }
            _ => tracing::debug!("{}", event),
        }
        self.tx.send(event).is_ok()
    }

    /// Publish a log line
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.publish(DeviceEvent::Log {
            level,
            message: message.into(),
        });
    }

    /// Publish an info log line
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Publish a warning log line
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    /// Publish an error log line
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Whether the consumer is still listening
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::detached()
    }
}
