//! Command execution through the session's native shell.
//!
//! Approved commands are handed to the shell with interpretation enabled, so
//! pipes, redirects and globs behave as typed. The child inherits this
//! process's stdin, stdout and stderr; nothing is captured.

use crate::environment::Session;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};

/// Result of running one approved command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Whether a run was attempted at all.
    pub attempted: bool,
    /// Exit code, when the child exited normally.
    pub exit_code: Option<i32>,
    /// `exit_code == Some(0)`.
    pub succeeded: bool,
}

impl ExecutionOutcome {
    pub fn exited(exit_code: Option<i32>) -> Self {
        Self {
            attempted: true,
            exit_code,
            succeeded: exit_code == Some(0),
        }
    }

    /// The interpreter could not be started.
    pub fn start_failure() -> Self {
        Self {
            attempted: true,
            exit_code: None,
            succeeded: false,
        }
    }
}

/// Program and arguments used to run a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellInvocation {
    /// `powershell -Command <line>` on Windows, `<shell> -c <line>` elsewhere.
    pub fn for_session(session: &Session, command_line: &str) -> Self {
        let flag = if session.os_family().is_windows() { "-Command" } else { "-c" };
        Self {
            program: session.shell_dialect().program().to_string(),
            args: vec![flag.to_string(), command_line.to_string()],
        }
    }
}

/// Trait for running shell processes.
///
/// This abstraction enables testing without spawning real processes.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs the invocation to completion and returns its exit code.
    ///
    /// `Ok(None)` means the child ended without an exit code (killed by a
    /// signal). `Err` means it never started.
    async fn run(&self, invocation: &ShellInvocation) -> std::io::Result<Option<i32>>;
}

/// Default process runner using tokio's process support.
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, invocation: &ShellInvocation) -> std::io::Result<Option<i32>> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await?;
        Ok(status.code())
    }
}

/// Runs approved commands for a session.
pub struct Executor {
    runner: Box<dyn ProcessRunner>,
}

impl Executor {
    pub fn new() -> Self {
        Self::with_runner(Box::new(SystemProcessRunner))
    }

    pub fn with_runner(runner: Box<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Runs `command_line` and reports what happened.
    ///
    /// Never fails: a missing interpreter is reported as an attempted run
    /// without an exit code.
    pub async fn run(&self, session: &Session, command_line: &str) -> ExecutionOutcome {
        let invocation = ShellInvocation::for_session(session, command_line);
        info!("Executing via {}: {}", invocation.program, command_line);

        match self.runner.run(&invocation).await {
            Ok(code) => {
                info!("Command finished with exit code {:?}", code);
                ExecutionOutcome::exited(code)
            }
            Err(e) => {
                error!("Failed to start {}: {}", invocation.program, e);
                ExecutionOutcome::start_failure()
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Credential, OsFamily, ShellDialect};
    use std::sync::{Arc, Mutex};

    struct MockProcessRunner {
        result: fn() -> std::io::Result<Option<i32>>,
        calls: Arc<Mutex<Vec<ShellInvocation>>>,
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn run(&self, invocation: &ShellInvocation) -> std::io::Result<Option<i32>> {
            self.calls.lock().unwrap().push(invocation.clone());
            (self.result)()
        }
    }

    fn session(os: OsFamily, shell: ShellDialect) -> Session {
        Session::new(os, shell, Credential::new("k"))
    }

    fn executor(result: fn() -> std::io::Result<Option<i32>>) -> (Executor, Arc<Mutex<Vec<ShellInvocation>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let runner = MockProcessRunner {
            result,
            calls: calls.clone(),
        };
        (Executor::with_runner(Box::new(runner)), calls)
    }

    #[test]
    fn test_windows_uses_powershell_command() {
        let invocation = ShellInvocation::for_session(
            &session(OsFamily::Windows, ShellDialect::PowerShell),
            "Invoke-RestMethod ifconfig.me",
        );
        assert_eq!(invocation.program, "powershell");
        assert_eq!(invocation.args, vec!["-Command", "Invoke-RestMethod ifconfig.me"]);
    }

    #[test]
    fn test_unix_uses_detected_shell() {
        let bash = ShellInvocation::for_session(&session(OsFamily::Linux, ShellDialect::Bash), "ls | wc -l");
        assert_eq!(bash.program, "bash");
        assert_eq!(bash.args, vec!["-c", "ls | wc -l"]);

        let zsh = ShellInvocation::for_session(&session(OsFamily::MacOs, ShellDialect::Zsh), "pwd");
        assert_eq!(zsh.program, "zsh");
    }

    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let (executor, calls) = executor(|| Ok(Some(0)));
        let outcome = executor.run(&session(OsFamily::Linux, ShellDialect::Bash), "ls -la").await;

        assert_eq!(outcome, ExecutionOutcome { attempted: true, exit_code: Some(0), succeeded: true });
        assert_eq!(calls.lock().unwrap()[0].args[1], "ls -la");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported_not_raised() {
        let (executor, _) = executor(|| Ok(Some(2)));
        let outcome = executor.run(&session(OsFamily::Linux, ShellDialect::Bash), "false").await;
        assert!(outcome.attempted);
        assert_eq!(outcome.exit_code, Some(2));
        assert!(!outcome.succeeded);
    }

    #[tokio::test]
    async fn test_start_failure_has_no_exit_code() {
        let (executor, _) = executor(|| Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no shell")));
        let outcome = executor.run(&session(OsFamily::Linux, ShellDialect::Zsh), "ls").await;
        assert_eq!(outcome, ExecutionOutcome::start_failure());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_reports_real_exit_code() {
        let runner = SystemProcessRunner;
        let invocation = ShellInvocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 7".to_string()],
        };
        assert_eq!(runner.run(&invocation).await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_system_runner_missing_program_is_error() {
        let runner = SystemProcessRunner;
        let invocation = ShellInvocation {
            program: "nlsh-definitely-missing-interpreter".to_string(),
            args: vec![],
        };
        assert!(runner.run(&invocation).await.is_err());
    }
}
