//! Streaming jobs
//!
//! A job feeds a command sequence through the session one line at a time.
//! The worker runs on tokio's blocking pool; the caller pauses, resumes
//! and stops it through [`JobControl`].

use crate::session::{SendOutcome, SerialSession, ShutdownHandle};
use parking_lot::{Condvar, Mutex};
use rppkit_core::{
    parse_program, ConnectionError, ConnectionState, ControllerError, DeviceCommand, DeviceEvent,
    Error, EventDispatcher, JobId, JobState, KinematicsError, Result,
};
use rppkit_kinematics::KinematicsModel;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How often a paused worker re-checks for resume or stop
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct JobStatus {
    state: JobState,
    job: Option<JobId>,
}

/// Job state shared between the caller and the worker
#[derive(Debug)]
pub struct JobControl {
    status: Mutex<JobStatus>,
    changed: Condvar,
}

impl Default for JobControl {
    fn default() -> Self {
        Self {
            status: Mutex::new(JobStatus {
                state: JobState::Idle,
                job: None,
            }),
            changed: Condvar::new(),
        }
    }
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> JobState {
        self.status.lock().state
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.status.lock().job
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Mark a new job as running
    pub fn begin(&self, job: JobId) -> std::result::Result<(), ControllerError> {
        let mut status = self.status.lock();
        if status.state.is_active() {
            return Err(ControllerError::JobActive {
                operation: "start a job".to_string(),
            });
        }
        status.state = JobState::Running;
        status.job = Some(job);
        Ok(())
    }

    /// Running to Paused; returns false and changes nothing otherwise
    pub fn pause(&self) -> bool {
        self.transition(JobState::Running, JobState::Paused)
    }

    /// Paused to Running; returns false and changes nothing otherwise
    pub fn resume(&self) -> bool {
        self.transition(JobState::Paused, JobState::Running)
    }

    /// Force the job to Stopped from any state
    pub fn stop(&self) -> JobState {
        self.stop_with(|| {})
    }

    /// Force Stopped and run `teardown` before any [`hold`](Self::hold)
    /// can observe the new state
    pub fn stop_with(&self, teardown: impl FnOnce()) -> JobState {
        let mut status = self.status.lock();
        let previous = status.state;
        status.state = JobState::Stopped;
        teardown();
        self.changed.notify_all();
        previous
    }

    /// Run `work` with the current state while no transition can happen
    ///
    /// `work` must not call back into this `JobControl`.
    pub fn hold<T>(&self, work: impl FnOnce(JobState) -> T) -> T {
        let status = self.status.lock();
        work(status.state)
    }

    /// Record the end of a job unless it was stopped meanwhile
    pub fn finish(&self, state: JobState) -> JobState {
        let mut status = self.status.lock();
        if status.state != JobState::Stopped {
            status.state = state;
        }
        self.changed.notify_all();
        status.state
    }

    /// Block while paused; returns the state that ended the wait
    pub fn wait_while_paused(&self, poll: Duration) -> JobState {
        let mut status = self.status.lock();
        while status.state == JobState::Paused {
            self.changed.wait_for(&mut status, poll);
        }
        status.state
    }

    fn transition(&self, from: JobState, to: JobState) -> bool {
        let mut status = self.status.lock();
        if status.state != from {
            return false;
        }
        status.state = to;
        self.changed.notify_all();
        true
    }
}

/// Everything the caller and the worker share
pub struct SessionState {
    pub session: Mutex<SerialSession>,
    pub model: Mutex<KinematicsModel>,
    pub job: JobControl,
    pub events: EventDispatcher,
    connection: Arc<Mutex<ConnectionState>>,
    shutdown: ShutdownHandle,
}

impl SessionState {
    pub fn new(session: SerialSession, model: KinematicsModel, events: EventDispatcher) -> Self {
        Self {
            connection: session.state_handle(),
            shutdown: session.shutdown_handle(),
            session: Mutex::new(session),
            model: Mutex::new(model),
            job: JobControl::new(),
            events,
        }
    }

    /// Connection state, without waiting for the session lock
    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.lock()
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown
    }

    /// Apply `command` to the model and publish the resulting position
    pub fn apply_to_model(&self, command: &DeviceCommand) -> std::result::Result<(), KinematicsError> {
        let mut model = self.model.lock();
        let position = model.apply(command)?;
        self.events.publish(DeviceEvent::Position {
            joints: model.joints(),
            position,
        });
        Ok(())
    }

    fn publish_job_state(&self, job: JobId, state: JobState) {
        self.events.publish(DeviceEvent::JobStateChanged { job, state });
    }
}

/// Result of a finished job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSummary {
    pub job: JobId,
    /// Complete or Stopped
    pub state: JobState,
    /// Lines in the job
    pub total: usize,
    /// Lines written to the device
    pub sent: usize,
    /// Motion commands the model accepted, one trajectory point each
    pub applied: usize,
    /// Lines whose prompt never arrived
    pub timeouts: usize,
}

/// Starts and steers streaming jobs
#[derive(Clone)]
pub struct StreamController {
    shared: Arc<SessionState>,
}

impl StreamController {
    pub fn new(shared: Arc<SessionState>) -> Self {
        Self { shared }
    }

    pub fn state(&self) -> JobState {
        self.shared.job.state()
    }

    /// Start streaming `commands` on a blocking worker
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, commands: Vec<DeviceCommand>) -> Result<JoinHandle<JobSummary>> {
        if self.shared.job.is_active() {
            return Err(ControllerError::JobActive {
                operation: "start a job".to_string(),
            }
            .into());
        }
        if self.shared.connection_state() == ConnectionState::Disconnected {
            return Err(ConnectionError::NotConnected.into());
        }
        if commands.is_empty() {
            return Err(ControllerError::EmptyJob.into());
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::other(format!("No async runtime: {}", e)))?;

        let job = JobId::new();
        self.shared.job.begin(job)?;
        self.shared.publish_job_state(job, JobState::Running);
        self.shared
            .events
            .info(format!("{} started: {} lines", job, commands.len()));

        let shared = Arc::clone(&self.shared);
        Ok(runtime.spawn_blocking(move || run_job(&shared, job, &commands)))
    }

    /// Parse a device-dialect file and start streaming it
    pub fn start_file(&self, path: impl AsRef<Path>) -> Result<JoinHandle<JobSummary>> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                let err = Error::file_access(path, e);
                self.shared.events.error(err.to_string());
                return Err(err);
            }
        };
        let (commands, errors) = parse_program(&text);
        for error in &errors {
            self.shared.events.warn(format!("Skipping {}", error));
        }
        self.start(commands)
    }

    /// Pause a running job; returns whether anything changed
    pub fn pause(&self) -> bool {
        let paused = self.shared.job.pause();
        if paused {
            self.announce(JobState::Paused);
        }
        paused
    }

    /// Resume a paused job; returns whether anything changed
    pub fn resume(&self) -> bool {
        let resumed = self.shared.job.resume();
        if resumed {
            self.announce(JobState::Running);
        }
        resumed
    }

    /// Stop any job and close the session
    ///
    /// A running worker notices within one read slice. A reconnect is
    /// needed before the next job.
    pub fn stop(&self) {
        let previous = self.shared.job.stop_with(|| self.shared.shutdown.trigger());
        // The worker releases the session lock once it sees the trigger.
        self.shared.session.lock().disconnect();
        if previous != JobState::Stopped {
            self.announce(JobState::Stopped);
        }
        self.shared.events.info("Stopped");
    }

    fn announce(&self, state: JobState) {
        if let Some(job) = self.shared.job.current_job() {
            self.shared.publish_job_state(job, state);
        }
    }
}

/// What the worker did with one command
enum Step {
    Written(String),
    Paused,
    Halted,
    Failed(ConnectionError),
}

fn run_job(shared: &SessionState, job: JobId, commands: &[DeviceCommand]) -> JobSummary {
    let timeout = shared.session.lock().config().stream_timeout;
    let mut summary = JobSummary {
        job,
        state: JobState::Running,
        total: commands.len(),
        sent: 0,
        applied: 0,
        timeouts: 0,
    };

    let mut index = 0;
    while let Some(command) = commands.get(index) {
        let line_number = index + 1;
        if shared.job.wait_while_paused(PAUSE_POLL_INTERVAL) == JobState::Stopped {
            return halted(shared, summary);
        }

        let mut session = shared.session.lock();
        // Stop cannot land between the state check, the model update and the write.
        let step = shared.job.hold(|state| match state {
            JobState::Paused => Step::Paused,
            JobState::Running if !shared.shutdown.is_triggered() => {
                match shared.apply_to_model(command) {
                    Ok(()) if command.has_motion() => summary.applied += 1,
                    Ok(()) => {}
                    Err(e) => shared
                        .events
                        .warn(format!("Line {} ({}): {}", line_number, command, e)),
                }
                let text = command.to_string();
                match session.write_line(&text) {
                    Ok(()) => Step::Written(text),
                    Err(e) => Step::Failed(e),
                }
            }
            _ => Step::Halted,
        });

        let outcome = match step {
            Step::Written(text) => session.await_prompt(&text, timeout),
            Step::Paused => continue,
            Step::Halted => return halted(shared, summary),
            Step::Failed(e) => return aborted(shared, summary, line_number, e),
        };
        drop(session);

        // Past this point the line reached the wire.
        summary.sent += 1;
        match outcome {
            Ok(SendOutcome::Acknowledged) => {}
            Ok(SendOutcome::TimedOut) => {
                summary.timeouts += 1;
                shared.events.warn(format!(
                    "Line {} timed out waiting for the device, continuing",
                    line_number
                ));
            }
            Err(e) => return aborted(shared, summary, line_number, e),
        }

        shared.events.publish(DeviceEvent::Progress {
            sent: summary.sent,
            total: summary.total,
        });
        index += 1;
    }

    summary.state = shared.job.finish(JobState::Complete);
    if summary.state == JobState::Complete {
        shared.publish_job_state(job, JobState::Complete);
        shared.events.publish(DeviceEvent::JobComplete {
            job,
            sent: summary.sent,
            timeouts: summary.timeouts,
        });
    }
    summary
}

fn halted(shared: &SessionState, mut summary: JobSummary) -> JobSummary {
    shared.events.info(format!(
        "{} stopped after {} of {} lines",
        summary.job, summary.sent, summary.total
    ));
    summary.state = JobState::Stopped;
    summary
}

fn aborted(
    shared: &SessionState,
    mut summary: JobSummary,
    line_number: usize,
    error: ConnectionError,
) -> JobSummary {
    if shared.job.state() != JobState::Stopped {
        shared
            .events
            .error(format!("Line {}: {}, aborting", line_number, error));
        shared.job.stop();
        shared.publish_job_state(summary.job, JobState::Stopped);
    }
    summary.state = JobState::Stopped;
    summary
}
