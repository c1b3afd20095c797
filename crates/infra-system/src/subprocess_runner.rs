// Subprocess command runner
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::info;

use fortify_core::port::command_runner::{CommandError, CommandOutput, CommandRunner, CommandSpec};
use fortify_core::port::TimeProvider;

/// Spawns external tools as isolated child processes, captures their
/// output, and enforces the per-command timeout. Processes that
/// outlive the timeout are killed on drop.
pub struct SubprocessRunner {
    time_provider: Arc<dyn TimeProvider>,
}

impl SubprocessRunner {
    pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { time_provider }
    }

    async fn spawn_and_wait(
        &self,
        spec: &CommandSpec,
    ) -> Result<std::process::Output, CommandError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| CommandError::Spawn {
            program: spec.program.clone(),
            message: e.to_string(),
        })?;

        if let Some(input) = &spec.stdin {
            // Feed stdin, then close it so line-oriented tools terminate
            let mut stdin = child.stdin.take().ok_or_else(|| CommandError::Io {
                program: spec.program.clone(),
                message: "stdin pipe unavailable".to_string(),
            })?;
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(|e| CommandError::Io {
                    program: spec.program.clone(),
                    message: e.to_string(),
                })?;
            drop(stdin);
        }

        match timeout(spec.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(CommandError::Io {
                program: spec.program.clone(),
                message: e.to_string(),
            }),
            Err(_) => Err(CommandError::Timeout {
                program: spec.program.clone(),
                timeout_ms: spec.timeout.as_millis() as i64,
            }),
        }
    }
}

#[async_trait]
impl CommandRunner for SubprocessRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let start_time = self.time_provider.now_millis();

        info!(
            program = %spec.program,
            args = ?spec.args,
            timeout_ms = spec.timeout.as_millis() as i64,
            "Starting subprocess"
        );

        let output = self.spawn_and_wait(spec).await?;
        let duration_ms = self.time_provider.now_millis() - start_time;

        let result = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
        };

        info!(
            program = %spec.program,
            exit_code = ?result.exit_code,
            duration_ms,
            "Subprocess completed"
        );

        Ok(result)
    }
}
