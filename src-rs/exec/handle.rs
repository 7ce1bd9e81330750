use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

/// Exit code reported when the process could not be started.
pub const LAUNCH_FAILURE_CODE: i32 = -1;
/// Exit code reported when the caller cancelled the run.
pub const CANCELLED_CODE: i32 = -2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExecutionOutcome {
    /// The process ran and exited with this code (zero or not).
    Exited(i32),
    /// The command never ran: spawn failure, command not found, not executable.
    LaunchFailed(String),
    Cancelled,
}

impl ExecutionOutcome {
    pub fn code(&self) -> i32 {
        match self {
            ExecutionOutcome::Exited(code) => *code,
            ExecutionOutcome::LaunchFailed(_) => LAUNCH_FAILURE_CODE,
            ExecutionOutcome::Cancelled => CANCELLED_CODE,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Exited(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExecutionState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecEvent {
    /// One line of merged stdout/stderr, trailing newline kept as produced.
    Output(String),
    /// Always the last event of a run.
    Exited(ExecutionOutcome),
}

#[derive(Debug, Default)]
struct BufferState {
    lines: Vec<String>,
    outcome: Option<ExecutionOutcome>,
}

/// Lines emitted by one run. Written only by the run's task; sealed once
/// the outcome is set.
#[derive(Debug, Default)]
pub(crate) struct OutputBuffer {
    state: Mutex<BufferState>,
}

impl OutputBuffer {
    fn with_state<T>(&self, f: impl FnOnce(&mut BufferState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    /// Returns false once the run has reached its terminal state.
    pub(crate) fn append(&self, line: String) -> bool {
        self.with_state(|s| {
            if s.outcome.is_some() {
                return false;
            }
            s.lines.push(line);
            true
        })
    }

    /// Only the first outcome is kept.
    pub(crate) fn finish(&self, outcome: ExecutionOutcome) -> bool {
        self.with_state(|s| {
            if s.outcome.is_some() {
                return false;
            }
            s.outcome = Some(outcome);
            true
        })
    }

    fn line_count(&self) -> usize {
        self.with_state(|s| s.lines.len())
    }

    fn lines_since(&self, offset: usize) -> Vec<String> {
        self.with_state(|s| s.lines.get(offset..).map(<[String]>::to_vec).unwrap_or_default())
    }

    fn outcome(&self) -> Option<ExecutionOutcome> {
        self.with_state(|s| s.outcome.clone())
    }
}

/// Read-only view of a run; cheap to clone and hand to any number of readers.
#[derive(Debug, Clone)]
pub struct ExecutionObserver {
    id: String,
    command: String,
    working_directory: PathBuf,
    buffer: Arc<OutputBuffer>,
}

impl ExecutionObserver {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn working_directory(&self) -> &PathBuf {
        &self.working_directory
    }

    /// Number of lines seen so far; may grow between calls while running.
    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    pub fn lines(&self) -> Vec<String> {
        self.buffer.lines_since(0)
    }

    /// Lines appended after the first `offset`, for incremental readers.
    pub fn lines_since(&self, offset: usize) -> Vec<String> {
        self.buffer.lines_since(offset)
    }

    pub fn outcome(&self) -> Option<ExecutionOutcome> {
        self.buffer.outcome()
    }

    pub fn state(&self) -> ExecutionState {
        match self.buffer.outcome() {
            None => ExecutionState::Running,
            Some(ExecutionOutcome::Exited(_)) => ExecutionState::Completed,
            Some(ExecutionOutcome::LaunchFailed(_)) => ExecutionState::Failed,
            Some(ExecutionOutcome::Cancelled) => ExecutionState::Cancelled,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state() != ExecutionState::Running
    }
}

/// A live or completed run, returned by `ExecutionChannel::launch`.
///
/// Events arrive in the order the process produced them and end with
/// exactly one `ExecEvent::Exited`. Dropping the handle does not stop the
/// process; call [`ExecutionHandle::cancel`] for that.
#[derive(Debug)]
pub struct ExecutionHandle {
    observer: ExecutionObserver,
    events: mpsc::UnboundedReceiver<ExecEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ExecutionHandle {
    pub(crate) fn new(
        id: String,
        command: String,
        working_directory: PathBuf,
        buffer: Arc<OutputBuffer>,
        events: mpsc::UnboundedReceiver<ExecEvent>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            observer: ExecutionObserver {
                id,
                command,
                working_directory,
                buffer,
            },
            events,
            cancel,
            task: Some(task),
        }
    }

    pub fn id(&self) -> &str {
        self.observer.id()
    }

    pub fn observer(&self) -> ExecutionObserver {
        self.observer.clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.observer.lines()
    }

    pub fn line_count(&self) -> usize {
        self.observer.line_count()
    }

    pub fn outcome(&self) -> Option<ExecutionOutcome> {
        self.observer.outcome()
    }

    pub fn state(&self) -> ExecutionState {
        self.observer.state()
    }

    /// Asks the run to stop. The handle still receives its terminal event.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run; lets callers impose their own deadline.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn next_event(&mut self) -> Option<ExecEvent> {
        self.events.recv().await
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<ExecEvent> {
        UnboundedReceiverStream::new(self.events)
    }

    /// Drains remaining events and returns the terminal outcome.
    pub async fn wait(mut self) -> ExecutionOutcome {
        while let Some(event) = self.events.recv().await {
            if let ExecEvent::Exited(outcome) = event {
                return outcome;
            }
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("Execution task {} ended abnormally: {}", self.id(), e);
            }
        }
        self.observer.outcome().unwrap_or_else(|| {
            ExecutionOutcome::LaunchFailed("execution task ended without an outcome".to_string())
        })
    }
}
