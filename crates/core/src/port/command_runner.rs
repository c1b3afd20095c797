// Command Runner Port
// Abstraction over external tool invocation: every collaborator is an
// opaque command with an {exit status, stdout, stderr} contract.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// One external command invocation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Fed to the child's stdin, then closed. Used by `chpasswd`.
    pub stdin: Option<String>,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
            stdin: None,
            timeout,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Captured output of a completed command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: i64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last `n` non-empty stderr lines, for failure findings
    pub fn stderr_tail(&self, n: usize) -> String {
        let lines: Vec<&str> = self
            .stderr
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect();
        let start = lines.len().saturating_sub(n);
        lines[start..].join("\n")
    }
}

/// Command invocation errors
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    #[error("Spawn failed for '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("Command '{program}' timeout after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: i64 },

    #[error("IO error running '{program}': {message}")]
    Io { program: String, message: String },
}

/// Command Runner trait
///
/// Implementations:
/// - SubprocessRunner: spawns external processes (infra-system)
/// - ScriptedCommandRunner: canned responses for tests
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run one command to completion and capture its output
    ///
    /// # Errors
    /// - CommandError::Spawn if the process cannot be started
    /// - CommandError::Timeout if execution exceeds the spec's timeout
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Scripted command runner: responses are queued per program name
    /// and popped in order; unscripted programs succeed with empty
    /// output. Every received spec is recorded for assertions.
    #[derive(Default)]
    pub struct ScriptedCommandRunner {
        responses: Mutex<HashMap<String, VecDeque<Result<CommandOutput, CommandError>>>>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedCommandRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_output(&self, program: &str, exit_code: i32, stdout: &str, stderr: &str) {
            self.responses
                .lock()
                .unwrap()
                .entry(program.to_string())
                .or_default()
                .push_back(Ok(CommandOutput {
                    exit_code: Some(exit_code),
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                    duration_ms: 5,
                }));
        }

        pub fn push_error(&self, program: &str, error: CommandError) {
            self.responses
                .lock()
                .unwrap()
                .entry(program.to_string())
                .or_default()
                .push_back(Err(error));
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_for(&self, program: &str) -> Vec<CommandSpec> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.program == program)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedCommandRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
            self.calls.lock().unwrap().push(spec.clone());

            let scripted = self
                .responses
                .lock()
                .unwrap()
                .get_mut(&spec.program)
                .and_then(|queue| queue.pop_front());

            match scripted {
                Some(response) => response,
                None => Ok(CommandOutput {
                    exit_code: Some(0),
                    stdout: String::new(),
                    stderr: String::new(),
                    duration_ms: 1,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let output = CommandOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "one\ntwo\n\nthree\nfour\nfive\nsix\n".to_string(),
            duration_ms: 1,
        };

        assert_eq!(output.stderr_tail(2), "five\nsix");
        assert_eq!(output.stderr_tail(100), "one\ntwo\nthree\nfour\nfive\nsix");
    }

    #[tokio::test]
    async fn test_scripted_runner_pops_in_order() {
        use mocks::ScriptedCommandRunner;

        let runner = ScriptedCommandRunner::new();
        runner.push_output("apt-get", 0, "first", "");
        runner.push_output("apt-get", 1, "", "boom");

        let spec = CommandSpec::new("apt-get", &["update"], Duration::from_secs(1));
        let first = runner.run(&spec).await.unwrap();
        let second = runner.run(&spec).await.unwrap();

        assert!(first.success());
        assert_eq!(first.stdout, "first");
        assert!(!second.success());
        assert_eq!(runner.calls_for("apt-get").len(), 2);
    }
}
