//! Running external Ansible binaries with a timeout.
//!
//! Failures to launch, non-zero exits and timeouts are all reported as
//! [`CommandOutput`] values; callers turn them into structured responses.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

use crate::environment::EnvMap;

/// Default subprocess timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Return code reported when the process could not be run to completion
pub const FAILED_RETURN_CODE: i32 = -1;

/// How long to keep draining pipes after a timed-out child was killed
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A command line to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Full child environment; `None` inherits the server's environment
    pub env: Option<EnvMap>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Captured result of a finished (or abandoned) command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.return_code == 0
    }

    pub fn launch_failure(error: impl std::fmt::Display) -> Self {
        Self {
            return_code: FAILED_RETURN_CODE,
            stdout: String::new(),
            stderr: error.to_string(),
            timed_out: false,
        }
    }
}

/// Executes command lines. The dispatcher only talks to this trait.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> CommandOutput;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn try_run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }
        if let Some(env) = &spec.env {
            cmd.env_clear().envs(env);
        }

        debug!("spawning child process");
        let deadline = Instant::now() + self.timeout;
        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to run {}", spec.program))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("stderr was not piped"))?;
        let stdout = Capture::spawn(stdout);
        let stderr = Capture::spawn(stderr);

        let (status, mut timed_out) = match child
            .wait_timeout(self.timeout)
            .context("Failed to wait for command")?
        {
            Some(status) => (Some(status), false),
            None => {
                warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "command timed out, killing"
                );
                child.kill().context("Failed to kill command")?;
                child.wait().context("Failed to reap command")?;
                (None, true)
            }
        };

        // Descendants may keep the pipes open after the child exits; the
        // deadline bounds the drain as well as the wait.
        let drain_until = if timed_out {
            Instant::now() + DRAIN_GRACE
        } else {
            deadline
        };
        let (stdout, stdout_closed) = stdout.collect(drain_until);
        let (mut stderr, stderr_closed) = stderr.collect(drain_until);

        let status = status.filter(|_| stdout_closed && stderr_closed);
        if !timed_out && status.is_none() {
            warn!(
                timeout_secs = self.timeout.as_secs(),
                "output still open at deadline, abandoning pipes"
            );
            timed_out = true;
        }

        let return_code = match status {
            Some(status) => status.code().unwrap_or(FAILED_RETURN_CODE),
            None => {
                if !stderr.is_empty() && !stderr.ends_with('\n') {
                    stderr.push('\n');
                }
                stderr.push_str(&format!(
                    "Command timed out after {} seconds",
                    self.timeout.as_secs()
                ));
                FAILED_RETURN_CODE
            }
        };

        debug!(return_code, timed_out, "command finished");
        Ok(CommandOutput {
            return_code,
            stdout,
            stderr,
            timed_out,
        })
    }
}

impl CommandRunner for SystemRunner {
    #[instrument(skip_all, fields(program = %spec.program, timeout_secs = self.timeout.as_secs()))]
    fn run(&self, spec: &CommandSpec) -> CommandOutput {
        match self.try_run(spec) {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "command could not be run");
                CommandOutput::launch_failure(format!("{err:#}"))
            }
        }
    }
}

/// Drains a pipe on a helper thread so the child never blocks on a full pipe.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

impl Capture {
    fn spawn<R: Read + Send + 'static>(mut stream: R) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&buffer);

        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            }
            let _ = tx.send(());
        });

        Self { buffer, done }
    }

    /// Wait until `deadline` for the stream to close and return what was read
    /// so far, plus whether the stream closed.
    fn collect(self, deadline: Instant) -> (String, bool) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let closed = self.done.recv_timeout(remaining).is_ok();

        let bytes = match self.buffer.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        (String::from_utf8_lossy(&bytes).into_owned(), closed)
    }
}
