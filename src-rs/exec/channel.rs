use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ExecutionConfig;
use crate::error::CoreResult;
use crate::session::id::generate_run_id;

use super::handle::{ExecEvent, ExecutionHandle, ExecutionOutcome, OutputBuffer};
use super::request::ExecutionRequest;

/// Runs shell commands on background tasks and streams their output.
#[derive(Debug, Clone)]
pub struct ExecutionChannel {
    shell: String,
    shell_args: Vec<String>,
    cancel_grace: Duration,
}

impl Default for ExecutionChannel {
    fn default() -> Self {
        Self::from_config(&ExecutionConfig::default())
    }
}

impl ExecutionChannel {
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            shell: config.shell_program(),
            shell_args: config.shell_arguments(),
            cancel_grace: Duration::from_millis(config.cancel_grace_ms),
        }
    }

    /// Starts `request` and returns immediately. Must be called from within
    /// a tokio runtime. Launch problems are reported through the handle's
    /// terminal event; only malformed requests fail here.
    pub fn launch(&self, request: ExecutionRequest) -> CoreResult<ExecutionHandle> {
        self.launch_with_scratch(request, None)
    }

    /// `scratch` is kept alive until the run has finished, then deleted.
    pub(crate) fn launch_with_scratch(
        &self,
        request: ExecutionRequest,
        scratch: Option<tempfile::TempPath>,
    ) -> CoreResult<ExecutionHandle> {
        request.validate()?;

        let id = generate_run_id();
        let buffer = Arc::new(OutputBuffer::default());
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        log::debug!(
            "Launching {} in {}: {}",
            id,
            request.working_directory.display(),
            request.command
        );

        let run = Run {
            id: id.clone(),
            shell: self.shell.clone(),
            shell_args: self.shell_args.clone(),
            cancel_grace: self.cancel_grace,
            buffer: Arc::clone(&buffer),
            tx,
            cancel: cancel.clone(),
        };
        let command = request.command.clone();
        let working_directory = request.working_directory.clone();
        let task = tokio::spawn(async move {
            run.execute(request).await;
            drop(scratch);
        });

        Ok(ExecutionHandle::new(
            id,
            command,
            working_directory,
            buffer,
            rx,
            cancel,
            task,
        ))
    }
}

/// State owned by one run's task.
struct Run {
    id: String,
    shell: String,
    shell_args: Vec<String>,
    cancel_grace: Duration,
    buffer: Arc<OutputBuffer>,
    tx: mpsc::UnboundedSender<ExecEvent>,
    cancel: CancellationToken,
}

impl Run {
    async fn execute(self, request: ExecutionRequest) {
        // stderr is folded into stdout by the shell itself, so both streams
        // share one pipe and keep the order the process wrote them in.
        let mut command = Command::new(&self.shell);
        command
            .args(&self.shell_args)
            .arg(merged_script(&self.shell, &request.command))
            .current_dir(&request.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                log::warn!("Run {} failed to launch: {}", self.id, e);
                self.finish(ExecutionOutcome::LaunchFailed(format!(
                    "failed to launch '{}': {}",
                    request.command, e
                )));
                return;
            }
        };

        let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
        let reader = spawn_reader(child.stdout.take(), line_tx);

        let mut cancelled = false;
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                line = line_rx.recv() => match line {
                    Some(line) => self.emit(line),
                    None => break,
                },
            }
        }

        if !cancelled {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {}
                status = child.wait() => {
                    let outcome = match status {
                        Ok(status) => outcome_from_status(status),
                        Err(e) => ExecutionOutcome::LaunchFailed(format!("failed to wait for process: {}", e)),
                    };
                    log::debug!("Run {} finished: {:?}", self.id, outcome);
                    self.finish(outcome);
                    return;
                }
            }
        }

        terminate(&mut child).await;

        // Flush whatever the pipes still hold, but never wait on them for long.
        let _ = tokio::time::timeout(self.cancel_grace, async {
            while let Some(line) = line_rx.recv().await {
                self.emit(line);
            }
        })
        .await;
        if let Some(reader) = reader {
            reader.abort();
        }

        log::debug!("Run {} cancelled", self.id);
        self.finish(ExecutionOutcome::Cancelled);
    }

    fn emit(&self, line: String) {
        if self.buffer.append(line.clone()) {
            // The handle may already be gone; observers still see the buffer.
            let _ = self.tx.send(ExecEvent::Output(line));
        }
    }

    fn finish(&self, outcome: ExecutionOutcome) {
        if self.buffer.finish(outcome.clone()) {
            let _ = self.tx.send(ExecEvent::Exited(outcome));
        }
    }
}

fn spawn_reader<R>(pipe: Option<R>, tx: mpsc::UnboundedSender<String>) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let pipe = pipe?;
    Some(tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf: Vec<u8> = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::debug!("Output pipe read failed: {}", e);
                    break;
                }
            }
        }
    }))
}

/// Wraps `command` so the shell redirects its stderr onto stdout before
/// running it.
fn merged_script(shell: &str, command: &str) -> String {
    let program = std::path::Path::new(shell)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if program == "cmd" {
        format!("({}) 2>&1", command)
    } else {
        format!("exec 2>&1\n{}", command)
    }
}

/// Kills the process and, on unix, its direct children first.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        let _ = Command::new("pkill")
            .arg("-P")
            .arg(pid.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
    }
    if let Err(e) = child.kill().await {
        log::debug!("Kill failed (process may have exited already): {}", e);
    }
}

/// Shell exit codes that mean the command itself never ran are reported as
/// launch failures; a signal death on unix maps to 128 + signal.
fn outcome_from_status(status: ExitStatus) -> ExecutionOutcome {
    match status.code() {
        #[cfg(unix)]
        Some(127) => ExecutionOutcome::LaunchFailed("command not found (exit 127)".to_string()),
        #[cfg(unix)]
        Some(126) => {
            ExecutionOutcome::LaunchFailed("command not executable (exit 126)".to_string())
        }
        #[cfg(windows)]
        Some(9009) => ExecutionOutcome::LaunchFailed("command not found (exit 9009)".to_string()),
        Some(code) => ExecutionOutcome::Exited(code),
        None => signal_outcome(status),
    }
}

#[cfg(unix)]
fn signal_outcome(status: ExitStatus) -> ExecutionOutcome {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => ExecutionOutcome::Exited(128 + signal),
        None => ExecutionOutcome::LaunchFailed("process ended without an exit code".to_string()),
    }
}

#[cfg(not(unix))]
fn signal_outcome(_status: ExitStatus) -> ExecutionOutcome {
    ExecutionOutcome::LaunchFailed("process ended without an exit code".to_string())
}
