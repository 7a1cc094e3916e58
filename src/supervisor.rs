//! Target process lifecycle: spawn, signal relay, exit status mapping.
//!
//! The interceptor exclusively owns the target's stdin/stdout pipes; the
//! target's stderr is inherited so its diagnostics merge into the
//! interceptor's own diagnostic stream.

use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};

// ── Error types ──

/// Errors from target command handling.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The target command string contained no tokens.
    #[error("target command is empty")]
    Empty,

    /// The target could not be started.
    #[error("failed to spawn target '{command}': {source}")]
    Spawn {
        /// The command line that was attempted.
        command: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

// ── Target command ──

/// A target server command parsed into an argv vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCommand {
    program: String,
    args: Vec<String>,
}

impl TargetCommand {
    /// Parse a command string into program and arguments by whitespace.
    ///
    /// Quoting is the outer layer's concern; arguments with embedded
    /// spaces cannot be expressed in this form.
    pub fn parse(spec: &str) -> Result<Self, SpawnError> {
        let mut tokens = spec.split_whitespace().map(str::to_owned);
        let program = tokens.next().ok_or(SpawnError::Empty)?;
        Ok(Self {
            program,
            args: tokens.collect(),
        })
    }

    /// The full command line, for diagnostics.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Spawn the target with piped stdin/stdout and inherited stderr.
    pub fn spawn(&self) -> Result<Child, SpawnError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpawnError::Spawn {
                command: self.display(),
                source,
            })
    }
}

// ── Signals and exit codes ──

/// Relay SIGINT and SIGTERM to the target process.
///
/// Runs until aborted. The interceptor forwards the same signal it
/// received so both processes shut down the same way; the interceptor
/// itself keeps running until the target exits and its output is drained.
#[cfg(unix)]
pub fn relay_signals(child_pid: u32) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use tokio::signal::unix::{signal, SignalKind};

    let raw = i32::try_from(child_pid).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "child pid out of range")
    })?;
    let pid = Pid::from_raw(raw);

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                received = interrupt.recv() => received.map(|()| Signal::SIGINT),
                received = terminate.recv() => received.map(|()| Signal::SIGTERM),
            };
            let Some(sig) = received else { break };
            tracing::debug!(signal = ?sig, "relaying signal to target");
            if let Err(e) = kill(pid, sig) {
                tracing::warn!(error = %e, "failed to relay signal to target");
            }
        }
    }))
}

/// Map a target exit status to the interceptor's own exit code.
///
/// A normal exit propagates the code; a signal-killed target yields
/// `128 + signal` on unix hosts.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128_i32.saturating_add(sig);
        }
    }
    1
}
