//! Machine controller
//!
//! Single entry point for the presentation layer. Owns the shared session
//! state and exposes connect, manual motion and job control. Blocking
//! session work runs on tokio's blocking pool.

use crate::session::{SendOutcome, SerialSession, SessionConfig};
use crate::stream::{JobSummary, SessionState, StreamController};
use crate::transport::{Connector, SerialConnector};
use rppkit_core::{
    CartesianPosition, ConnectionError, ConnectionState, ControllerError, DeviceCommand, Error,
    EventDispatcher, JobState, JointAxis, JointState, MachineGeometry, Result,
};
use rppkit_kinematics::{KinematicsModel, TrajectoryLog};
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Controller settings
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerConfig {
    pub session: SessionConfig,
    pub geometry: MachineGeometry,
}

/// Read-only view of the machine
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSnapshot {
    pub connection: ConnectionState,
    pub job: JobState,
    pub joints: JointState,
    pub position: CartesianPosition,
    pub trajectory_len: usize,
}

/// Owns the session, the kinematic model and the job control
#[derive(Clone)]
pub struct MachineController {
    shared: Arc<SessionState>,
    stream: StreamController,
}

impl MachineController {
    pub fn new(connector: Arc<dyn Connector>, config: ControllerConfig, events: EventDispatcher) -> Self {
        let session = SerialSession::new(connector, config.session, events.clone());
        let model = KinematicsModel::new(config.geometry);
        let shared = Arc::new(SessionState::new(session, model, events));
        Self {
            stream: StreamController::new(Arc::clone(&shared)),
            shared,
        }
    }

    /// Controller backed by real serial ports
    pub fn with_serial(config: ControllerConfig, events: EventDispatcher) -> Self {
        Self::new(Arc::new(SerialConnector), config, events)
    }

    pub fn shared(&self) -> &Arc<SessionState> {
        &self.shared
    }

    /// Open `port` and wait for the device
    pub async fn connect(&self, port: &str, baud_rate: u32) -> Result<()> {
        let port = port.to_string();
        self.blocking(move |shared| {
            shared.session.lock().connect(&port, baud_rate)?;
            Ok(())
        })
        .await
    }

    pub async fn disconnect(&self) -> Result<()> {
        if self.shared.job.is_active() {
            self.stream.stop();
            return Ok(());
        }
        self.blocking(|shared| {
            shared.session.lock().disconnect();
            Ok(())
        })
        .await
    }

    /// Send one device-dialect line typed by the user
    pub async fn send_manual(&self, text: &str) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ControllerError::EmptyCommand.into());
        }
        let command = DeviceCommand::parse(text, 1)?;
        self.send_command(command, "send a manual command").await
    }

    /// Move one joint by `distance`
    pub async fn jog(&self, axis: JointAxis, distance: f64, feedrate: f64) -> Result<SendOutcome> {
        self.shared.events.info(format!(
            "Jog {} by {:.3} {}",
            axis,
            distance,
            axis.unit()
        ));
        let command = DeviceCommand::JogAxis {
            axis,
            distance,
            feedrate: Some(feedrate),
        };
        self.send_command(command, "jog").await
    }

    pub async fn home(&self) -> Result<SendOutcome> {
        self.send_command(DeviceCommand::Home, "home").await
    }

    /// Start streaming a command sequence
    pub fn start(&self, commands: Vec<DeviceCommand>) -> Result<JoinHandle<JobSummary>> {
        self.stream.start(commands)
    }

    /// Start streaming a device-dialect file
    pub fn start_file(&self, path: impl AsRef<Path>) -> Result<JoinHandle<JobSummary>> {
        self.stream.start_file(path)
    }

    /// Pause the running job; a no-op otherwise
    pub fn pause(&self) -> bool {
        self.stream.pause()
    }

    /// Resume the paused job; a no-op otherwise
    pub fn resume(&self) -> bool {
        self.stream.resume()
    }

    /// Abort any job and close the session
    pub fn stop(&self) {
        self.stream.stop();
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        let job = self.shared.job.state();
        let model = self.shared.model.lock();
        MachineSnapshot {
            connection: self.shared.connection_state(),
            job,
            joints: model.joints(),
            position: model.position(),
            trajectory_len: model.trajectory().len(),
        }
    }

    /// Copy of the trajectory recorded so far
    pub fn trajectory(&self) -> TrajectoryLog {
        self.shared.model.lock().trajectory().clone()
    }

    /// Clear the model back to the home position
    pub fn reset_model(&self) -> Result<()> {
        self.reject_if_active("reset the model")?;
        self.shared.model.lock().reset();
        Ok(())
    }

    async fn send_command(&self, command: DeviceCommand, operation: &str) -> Result<SendOutcome> {
        self.reject_if_active(operation)?;
        let operation = operation.to_string();
        self.blocking(move |shared| {
            let mut session = shared.session.lock();
            let timeout = session.config().manual_timeout;
            let text = command.to_string();

            // Same gate as the streaming worker: a job cannot start in between.
            shared.job.hold(|state| -> Result<()> {
                if state.is_active() {
                    return Err(ControllerError::JobActive { operation }.into());
                }
                if !session.is_connected() || shared.shutdown_handle().is_triggered() {
                    return Err(ConnectionError::NotConnected.into());
                }
                if let Err(e) = shared.apply_to_model(&command) {
                    shared.events.warn(format!("{}: {}", command, e));
                }
                session.write_line(&text)?;
                Ok(())
            })?;

            Ok(session.await_prompt(&text, timeout)?)
        })
        .await
    }

    fn reject_if_active(&self, operation: &str) -> Result<()> {
        if self.shared.job.is_active() {
            return Err(ControllerError::JobActive {
                operation: operation.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SessionState) -> Result<T> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || work(&shared))
            .await
            .map_err(|e| Error::other(format!("Session task failed: {}", e)))?
    }
}
