use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use conductor_core::config::ShellWorkerConfig;
use conductor_core::{InputData, TaskDescriptor, Worker, WorkerError};
use serde_json::{json, Value};
use tokio::process::Command;

/// Runs `input.command` through the configured shell.
///
/// The task id and the full input (as JSON) are exported as
/// `CONDUCTOR_TASK_ID` and `CONDUCTOR_INPUT`. A non-zero exit status is a
/// failure carrying the tail of stderr.
pub struct ShellWorker {
    shell: String,
    timeout: Option<Duration>,
}

const STDERR_TAIL: usize = 512;

impl ShellWorker {
    pub fn new(cfg: &ShellWorkerConfig) -> Self {
        Self {
            shell: cfg.shell.clone(),
            timeout: cfg.default_timeout_ms.map(Duration::from_millis),
        }
    }

    fn command_of<'a>(task: &TaskDescriptor, input: &'a InputData) -> Result<&'a str, WorkerError> {
        match input.get("command") {
            Some(Value::String(cmd)) if !cmd.trim().is_empty() => Ok(cmd),
            Some(_) => Err(WorkerError::InvalidInput(format!(
                "task '{}': `command` must be a non-empty string",
                task.id
            ))),
            None => Err(WorkerError::InvalidInput(format!(
                "task '{}': missing `command`",
                task.id
            ))),
        }
    }
}

impl Default for ShellWorker {
    fn default() -> Self {
        Self::new(&ShellWorkerConfig::default())
    }
}

#[async_trait]
impl Worker for ShellWorker {
    fn name(&self) -> &str {
        "shell"
    }

    async fn execute(&self, task: &TaskDescriptor, input: &InputData) -> Result<Value, WorkerError> {
        let command = Self::command_of(task, input)?;
        let input_json = serde_json::to_string(input)?;

        tracing::debug!(task_id = %task.id, shell = %self.shell, command, "spawning");
        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .env("CONDUCTOR_TASK_ID", &task.id)
            .env("CONDUCTOR_INPUT", input_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| WorkerError::Timeout(limit.as_millis() as u64))??,
            None => child.wait_with_output().await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        let code = output.status.code();

        if !output.status.success() {
            let tail_start = stderr
                .char_indices()
                .rev()
                .nth(STDERR_TAIL.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(0);
            return Err(WorkerError::failed(format!(
                "command exited with {}: {}",
                code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                &stderr[tail_start..]
            )));
        }

        // JSON on stdout is passed through as a value; anything else as text.
        let value = serde_json::from_str::<Value>(&stdout).unwrap_or_else(|_| Value::String(stdout));
        Ok(json!({
            "exitCode": code,
            "stdout": value,
            "stderr": stderr,
        }))
    }
}
