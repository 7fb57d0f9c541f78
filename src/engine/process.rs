//! Real-process analysis invoker.
//!
//! One short-lived engine process per request. Stdout carries the JSON
//! report, stderr carries diagnostics. The wait is bounded by the configured
//! timeout. On unix the engine runs in its own process group, and the whole
//! group is killed once the engine exits or times out, so helper processes
//! it started never outlive the request.

use async_trait::async_trait;
use serde_json::Value;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::gate::ConcurrencyGate;
use super::traits::AnalysisInvoker;
use super::types::{AnalysisOutcome, EnginePayload, InvokerConfig, Transport};
use crate::constants::engine::{DRAIN_GRACE_MS, UNKNOWN_EXIT_CODE};
use crate::data::request::AnalysisRequest;

pub struct ProcessInvoker {
    config: InvokerConfig,
    gate: Option<ConcurrencyGate>,
}

impl ProcessInvoker {
    pub fn new(config: InvokerConfig) -> Self {
        Self { config, gate: None }
    }

    /// Limit concurrent engine processes with a shared gate.
    pub fn with_gate(mut self, gate: ConcurrencyGate) -> Self {
        self.gate = Some(gate);
        self
    }

    fn build_command(&self, payload: &str) -> Command {
        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        match &self.config.transport {
            Transport::EnvVariable(name) => {
                cmd.env(name, payload).stdin(Stdio::null());
            }
            Transport::StdinPipe => {
                cmd.stdin(Stdio::piped());
            }
        }
        cmd
    }

    async fn run(&self, payload: String) -> AnalysisOutcome {
        let mut child = match self.build_command(&payload).spawn() {
            Ok(c) => c,
            Err(e) => {
                error!("❌ [ENGINE] Failed to start {}: {}", self.config.command.display(), e);
                return AnalysisOutcome::EngineFailure {
                    exit_code: UNKNOWN_EXIT_CODE,
                    stderr: format!("failed to start analysis engine: {e}"),
                };
            }
        };
        // The engine leads its own process group, so its pid is the group id
        let group = child.id();

        // Feed stdin concurrently with draining the output pipes so a large
        // payload can't deadlock against a full stdout buffer.
        let stdin_task = match (&self.config.transport, child.stdin.take()) {
            (Transport::StdinPipe, Some(mut stdin)) => Some(tokio::spawn(async move {
                if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                    debug!("[ENGINE] stdin closed before payload was written: {}", e);
                }
                // Dropping stdin closes the pipe and signals EOF
            })),
            _ => None,
        };

        let stdout = CapturedStream::spawn(child.stdout.take());
        let stderr = CapturedStream::spawn(child.stderr.take());

        let waited = tokio::time::timeout(self.config.timeout, child.wait()).await;

        // Whatever the engine started must not outlive it
        kill_process_group(group);
        if let Some(task) = stdin_task {
            task.abort();
        }

        match waited {
            Ok(status) => {
                let grace = Duration::from_millis(DRAIN_GRACE_MS);
                let stdout = stdout.finish(grace).await;
                let stderr = stderr.finish(grace).await;
                classify_exit(status, &stdout, &stderr)
            }
            Err(_) => {
                warn!(
                    "⏱️ [ENGINE] Timed out after {:?}, killing process group {:?}",
                    self.config.timeout, group
                );
                // kill() sends SIGKILL and reaps the child
                if let Err(e) = child.kill().await {
                    warn!("[ENGINE] Failed to kill timed out engine: {}", e);
                }
                stdout.abort();
                stderr.abort();
                AnalysisOutcome::Timeout
            }
        }
    }
}

#[async_trait]
impl AnalysisInvoker for ProcessInvoker {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn invoke(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let payload = match EnginePayload::from_request(request).to_json() {
            Ok(p) => p,
            Err(e) => {
                return AnalysisOutcome::EngineFailure {
                    exit_code: UNKNOWN_EXIT_CODE,
                    stderr: format!("failed to serialize engine payload: {e}"),
                }
            }
        };

        // Held until the engine has exited or been killed
        let _permit = match &self.gate {
            Some(gate) => match gate.acquire().await {
                Some(permit) => Some(permit),
                None => {
                    return AnalysisOutcome::EngineFailure {
                        exit_code: UNKNOWN_EXIT_CODE,
                        stderr: "analysis engine gate is closed".to_string(),
                    }
                }
            },
            None => None,
        };

        info!(
            "⚙️ [ENGINE] Launching {} ({} bars, type={})",
            self.config.command.display(),
            request.series.len(),
            request.analysis_type
        );
        let started = Instant::now();
        let outcome = self.run(payload).await;

        info!(
            outcome = outcome.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "⚙️ [ENGINE] Finished"
        );
        outcome
    }
}

/// One output pipe drained into a shared buffer by a background task, so
/// the bytes read so far survive if the task has to be abandoned.
struct CapturedStream {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl CapturedStream {
    fn spawn<R: AsyncRead + Unpin + Send + 'static>(stream: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let sink = buffer.clone();
        let task = tokio::spawn(async move {
            let Some(mut stream) = stream else { return };
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => {
                        sink.lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .extend_from_slice(&chunk[..n]);
                    }
                    Err(e) => {
                        debug!("[ENGINE] Output stream read failed: {}", e);
                        break;
                    }
                }
            }
        });
        Self { buffer, task }
    }

    /// Wait up to `grace` for EOF, then return what was captured.
    async fn finish(mut self, grace: Duration) -> Vec<u8> {
        if tokio::time::timeout(grace, &mut self.task).await.is_err() {
            debug!("[ENGINE] Output pipe still open after {:?}, abandoning it", grace);
        }
        self.abort()
    }

    fn abort(self) -> Vec<u8> {
        self.task.abort();
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

/// SIGKILL every process left in the engine's group.
#[cfg(unix)]
fn kill_process_group(group: Option<u32>) {
    let Some(pgid) = group.and_then(|id| libc::pid_t::try_from(id).ok()) else {
        return;
    };
    // SAFETY: kill(2) takes no pointers; a negative pid targets the group
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!("[ENGINE] Failed to kill process group {}: {}", pgid, err);
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_group: Option<u32>) {}

/// Turn a finished process into an outcome.
pub fn classify_exit(status: std::io::Result<ExitStatus>, stdout: &[u8], stderr: &[u8]) -> AnalysisOutcome {
    match status {
        Ok(status) if status.success() => {
            let text = String::from_utf8_lossy(stdout);
            match serde_json::from_str::<Value>(text.trim()) {
                Ok(value) => AnalysisOutcome::Success(value),
                Err(e) => {
                    warn!("[ENGINE] Exited 0 but stdout is not JSON: {}", e);
                    AnalysisOutcome::MalformedOutput(text.into_owned())
                }
            }
        }
        Ok(status) => {
            let exit_code = status.code().unwrap_or(UNKNOWN_EXIT_CODE);
            warn!("[ENGINE] Exited with code {}", exit_code);
            AnalysisOutcome::EngineFailure {
                exit_code,
                stderr: String::from_utf8_lossy(stderr).into_owned(),
            }
        }
        Err(e) => AnalysisOutcome::EngineFailure {
            exit_code: UNKNOWN_EXIT_CODE,
            stderr: format!("failed to wait for analysis engine: {e}"),
        },
    }
}
