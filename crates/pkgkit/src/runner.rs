//! Blocking command execution under an identity, environment and timeout.
//!
//! [`CommandRunner`] is the seam between backends and the operating system:
//! backends build a [`CommandSpec`], the runner executes it. Tests swap in a
//! recording runner to assert exactly which processes would have been spawned.

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::types::RawResult;
use log::debug;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often a running child is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Exit status `env` uses when the target program does not exist.
const ENV_NOT_FOUND: i32 = 127;

/// A fully described process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// User to run as; `None` runs as the current (privileged) identity
    pub identity: Option<String>,
    /// Complete environment; nothing else is inherited
    pub env: Environment,
    /// Upper bound on wall-clock time
    pub timeout: Duration,
}

impl CommandSpec {
    /// Create a spec with an empty environment and a one minute timeout.
    pub fn new<S: AsRef<str>>(program: &str, args: &[S]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
            identity: None,
            env: Environment::default(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Run as the given identity.
    pub fn with_identity(mut self, identity: Option<&str>) -> Self {
        self.identity = identity.map(str::to_string);
        self
    }

    /// Use the given environment.
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Bound the call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Human-readable command line for logs and errors.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        match &self.identity {
            Some(user) => format!("{line} (as {user})"),
            None => line,
        }
    }
}

/// Executes commands and captures their output.
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion.
    ///
    /// A non-zero exit is returned as `Ok`; only spawn failures
    /// ([`Error::ExecutionFailed`]) and expired timeouts ([`Error::Timeout`])
    /// are errors.
    fn run(&self, spec: &CommandSpec) -> Result<RawResult>;
}

/// Runner that spawns real processes.
///
/// With an identity the command goes through
/// `sudo -n -u <identity> -- env -i K=V... program args...` so the sanitized
/// environment survives the identity switch.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    sudo: String,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            sudo: "sudo".to_string(),
        }
    }
}

impl SystemRunner {
    /// Create a runner using `sudo` from the sanitized PATH.
    pub fn new() -> Self {
        Self::default()
    }

    fn build_command(&self, spec: &CommandSpec) -> Command {
        let mut cmd = match &spec.identity {
            Some(user) => {
                let mut cmd = Command::new(&self.sudo);
                cmd.args(["-n", "-u", user.as_str(), "--", "env", "-i"])
                    .args(spec.env.to_assignments())
                    .arg(&spec.program)
                    .args(&spec.args);
                cmd
            }
            None => {
                let mut cmd = Command::new(&spec.program);
                cmd.args(&spec.args);
                cmd
            }
        };

        cmd.env_clear()
            .envs(spec.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn spawn_failure(program: &str, message: impl Into<String>) -> Error {
        Error::ExecutionFailed {
            program: program.to_string(),
            message: message.into(),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec) -> Result<RawResult> {
        debug!("running: {}", spec.display());

        let mut child = self
            .build_command(spec)
            .spawn()
            .map_err(|e| Self::spawn_failure(&spec.program, e.to_string()))?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let exit_code = match wait_with_deadline(&mut child, spec) {
            Ok(code) => code,
            Err(e) => {
                // Readers are detached: a surviving grandchild may still hold the pipes.
                drop((stdout, stderr));
                return Err(e);
            }
        };

        let result = RawResult {
            exit_code,
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        };

        if spec.identity.is_some() {
            if result.exit_code == ENV_NOT_FOUND {
                return Err(Self::spawn_failure(&spec.program, result.error_message()));
            }
            if result.stderr.contains("sudo:") && result.stderr.contains("password is required") {
                return Err(Self::spawn_failure(
                    &spec.program,
                    "sudo refused to switch identity without a password",
                ));
            }
        }

        debug!("{} exited with {}", spec.program, result.exit_code);
        Ok(result)
    }
}

/// Read a pipe to completion on a background thread.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).to_string()
    })
}

/// Point in time after which a call is killed.
///
/// `None` when the timeout is too large to represent, which waits without a bound.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

/// Wait for the child, killing it once the spec's timeout expires.
fn wait_with_deadline(child: &mut Child, spec: &CommandSpec) -> Result<i32> {
    let deadline = deadline_after(spec.timeout);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status.code().unwrap_or(-1));
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::Timeout {
                program: spec.program.clone(),
                seconds: spec.timeout.as_secs(),
            });
        }

        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::clean_env;
    use crate::error::ErrorCategory;

    #[test]
    fn test_spec_display() {
        let spec = CommandSpec::new("pacman", &["-S", "--needed", "vim"]);
        assert_eq!(spec.display(), "pacman -S --needed vim");

        let spec = spec.with_identity(Some("admin"));
        assert_eq!(spec.display(), "pacman -S --needed vim (as admin)");
    }

    #[test]
    fn test_identity_command_wraps_in_sudo_env() {
        let spec = CommandSpec::new("yay", &["-Q"])
            .with_identity(Some("admin"))
            .with_env(clean_env(Some("admin")));
        let cmd = SystemRunner::new().build_command(&spec);

        assert_eq!(cmd.get_program(), "sudo");
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(&args[..6], &["-n", "-u", "admin", "--", "env", "-i"]);
        assert!(args.contains(&"HOME=/home/admin".to_string()));
        assert_eq!(&args[args.len() - 2..], &["yay", "-Q"]);
    }

    #[test]
    fn test_privileged_command_runs_directly() {
        let spec = CommandSpec::new("pacman", &["-Q"]).with_env(clean_env(None));
        let cmd = SystemRunner::new().build_command(&spec);

        assert_eq!(cmd.get_program(), "pacman");
        let envs: Vec<_> = cmd.get_envs().collect();
        assert_eq!(envs.len(), 9);
    }

    #[test]
    fn test_missing_binary_is_execution_failure() {
        let spec = CommandSpec::new("pkgkit-definitely-missing-binary", &["-Q"])
            .with_env(clean_env(None));
        let err = SystemRunner::new().run(&spec).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Execution);
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_not_an_error() {
        let spec = CommandSpec::new("sh", &["-c", "echo out; echo err >&2; exit 3"])
            .with_env(clean_env(None));
        let result = SystemRunner::new().run(&spec).unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_the_process() {
        let spec = CommandSpec::new("sh", &["-c", "sleep 5"])
            .with_env(clean_env(None))
            .with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let err = SystemRunner::new().run(&spec).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_returns_while_grandchild_holds_pipes() {
        let spec = CommandSpec::new("sh", &["-c", "sleep 3 & wait"])
            .with_env(clean_env(None))
            .with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let err = SystemRunner::new().run(&spec).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_unrepresentable_timeout_has_no_deadline() {
        assert!(deadline_after(Duration::from_secs(u64::MAX)).is_none());
        assert!(deadline_after(Duration::from_secs(60)).is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_huge_timeout_does_not_panic() {
        let spec = CommandSpec::new("sh", &["-c", "exit 0"])
            .with_env(clean_env(None))
            .with_timeout(Duration::from_secs(u64::MAX));
        let result = SystemRunner::new().run(&spec).unwrap();
        assert_eq!(result.exit_code, 0);
    }
}
