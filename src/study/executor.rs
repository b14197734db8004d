//! Step execution
//!
//! [`StepExecutor`] is the seam between the runner's ordering logic and the
//! operating system. [`ProcessExecutor`] spawns real processes; tests use
//! [`super::mock::MockExecutor`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use super::error::StudyError;
use super::interrupt::Interrupt;
use super::transcript;

/// Everything needed to run one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInvocation {
    pub step: String,
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Variables added to the inherited environment
    pub env: BTreeMap<String, OsString>,
    pub transcript_path: PathBuf,
    /// Echo the step's output to the launcher's stdout
    pub echo: bool,
}

/// How a step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    /// Non-zero exit; `code` is `None` when killed by a signal
    Failed { code: Option<i32> },
    /// The program could not be found
    ProgramNotFound,
    /// The operator pressed Ctrl-C while the step was running
    Interrupted,
}

impl StepStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, StepStatus::Succeeded)
    }

    /// Process exit code the launcher should report for this status
    pub fn exit_code(&self) -> u8 {
        match self {
            StepStatus::Succeeded => 0,
            StepStatus::Failed { code } => code
                .and_then(|c| u8::try_from(c).ok())
                .filter(|c| *c != 0)
                .unwrap_or(1),
            StepStatus::ProgramNotFound => 127,
            StepStatus::Interrupted => 130,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Succeeded => "succeeded",
            StepStatus::Failed { .. } => "failed",
            StepStatus::ProgramNotFound => "program not found",
            StepStatus::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Failed { code: Some(code) } => write!(f, "failed (exit code {code})"),
            StepStatus::Failed { code: None } => write!(f, "failed (terminated by signal)"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Run a step to completion.
    ///
    /// A step that starts and fails returns `Ok` with a failing status;
    /// `Err` is reserved for problems on the launcher's side. Once
    /// `interrupt` is triggered the step is stopped and reported as
    /// [`StepStatus::Interrupted`].
    async fn execute(
        &self,
        invocation: &StepInvocation,
        interrupt: &Interrupt,
    ) -> Result<StepStatus, StudyError>;
}

/// How long to wait for the transcript after killing an interrupted step
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs steps as child processes
#[derive(Debug, Default, Clone)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepExecutor for ProcessExecutor {
    async fn execute(
        &self,
        inv: &StepInvocation,
        interrupt: &Interrupt,
    ) -> Result<StepStatus, StudyError> {
        let Some(program) = resolve_program(&inv.program, &inv.cwd) else {
            tracing::error!(step = %inv.step, program = %inv.program, "Program not found");
            return Ok(StepStatus::ProgramNotFound);
        };

        let transcript_err = |source: io::Error| StudyError::Transcript {
            step: inv.step.clone(),
            source,
        };
        let spawn_err = |source: io::Error| StudyError::Spawn {
            step: inv.step.clone(),
            source,
        };

        let transcript_file = File::create(&inv.transcript_path).map_err(transcript_err)?;

        // stdout and stderr share one pipe so the transcript keeps the
        // interleaving the process produced
        let (reader, writer) = io::pipe().map_err(spawn_err)?;
        let stderr_writer = writer.try_clone().map_err(spawn_err)?;

        let mut cmd = Command::new(&program);
        cmd.args(&inv.args)
            .current_dir(&inv.cwd)
            .envs(&inv.env)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);

        // Own process group: the launcher decides what Ctrl-C does to the
        // step, and everything the step starts can be killed with it
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(
            step = %inv.step,
            program = %program.display(),
            args = ?inv.args,
            cwd = %inv.cwd.display(),
            "Spawning step"
        );
        let mut child = cmd.spawn().map_err(spawn_err)?;
        let pid = child.id();
        // The command still owns the parent's write ends; EOF only arrives
        // once they are closed
        drop(cmd);

        let echo = inv.echo;
        let mut tee = tokio::task::spawn_blocking(move || {
            transcript::tee(reader, transcript_file, echo.then(io::stdout))
        });

        let status = tokio::select! {
            status = child.wait() => status.map_err(spawn_err)?,
            _ = interrupt.triggered() => {
                tracing::warn!(step = %inv.step, "Interrupted, stopping step");
                kill_step(&inv.step, pid, &mut child);
                if let Err(e) = child.wait().await {
                    tracing::warn!(step = %inv.step, error = %e, "Failed to reap step");
                }
                drain_after_interrupt(&inv.step, tee).await;
                return Ok(StepStatus::Interrupted);
            }
        };

        // Processes the step left behind may still hold the pipe open
        let joined = tokio::select! {
            joined = &mut tee => joined,
            _ = interrupt.triggered() => {
                tracing::warn!(step = %inv.step, "Interrupted while step output was still open");
                kill_step(&inv.step, pid, &mut child);
                drain_after_interrupt(&inv.step, tee).await;
                return Ok(StepStatus::Interrupted);
            }
        };
        let copied = match joined {
            Ok(result) => result.map_err(transcript_err)?,
            Err(e) => return Err(transcript_err(io::Error::other(e))),
        };
        tracing::debug!(step = %inv.step, bytes = copied, "Transcript complete");

        Ok(match status.code() {
            Some(0) => StepStatus::Succeeded,
            code => StepStatus::Failed { code },
        })
    }
}

/// Kill the step's process group, or just the step where groups are not
/// available
fn kill_step(step: &str, pid: Option<u32>, child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) {
        // The group outlives its leader while any member is alive
        let result = unsafe { libc::kill(-pid, libc::SIGKILL) };
        if result == -1 {
            let e = io::Error::last_os_error();
            if e.raw_os_error() != Some(libc::ESRCH) {
                tracing::warn!(step, error = %e, "Failed to kill step process group");
            }
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    // Already gone if the group kill reached it
    let _ = child.start_kill();
}

async fn drain_after_interrupt(step: &str, tee: JoinHandle<io::Result<u64>>) {
    match tokio::time::timeout(DRAIN_TIMEOUT, tee).await {
        Ok(Ok(Ok(bytes))) => tracing::debug!(step, bytes, "Transcript closed after interrupt"),
        Ok(Ok(Err(e))) => tracing::warn!(step, error = %e, "Transcript incomplete after interrupt"),
        Ok(Err(e)) => tracing::warn!(step, error = %e, "Transcript task failed after interrupt"),
        Err(_) => tracing::warn!(
            step,
            "Step output still open after interrupt, transcript may be incomplete"
        ),
    }
}

/// Bare names are looked up on PATH; anything with a separator is taken
/// relative to the step's working directory.
fn resolve_program(program: &str, cwd: &Path) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    if path.components().count() > 1 {
        let candidate = cwd.join(path);
        return candidate.is_file().then_some(candidate);
    }
    which::which(program).ok()
}
