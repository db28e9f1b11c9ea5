//! # RPPKit Communication
//!
//! Talks to the RPP device over a byte transport:
//! - [`transport`]: transport traits, the serial implementation and port discovery
//! - [`session`]: connect handshake and the send-and-await-prompt protocol
//! - [`stream`]: job control and the streaming worker
//! - [`controller`]: the caller-facing machine controller

pub mod controller;
pub mod session;
pub mod stream;
pub mod transport;

pub use controller::{ControllerConfig, MachineController, MachineSnapshot};
pub use session::{SendOutcome, SerialSession, SessionConfig, ShutdownHandle};
pub use stream::{JobControl, JobSummary, SessionState, StreamController, PAUSE_POLL_INTERVAL};
pub use transport::{list_ports, Connector, SerialConnector, SerialPortInfo, Transport};
