use std::time::Duration;

use async_trait::async_trait;
use conductor_core::{InputData, TaskDescriptor, Worker, WorkerError};
use serde_json::{json, Value};

/// Waits `ms` milliseconds, then succeeds, or fails when `fail` is true.
#[derive(Debug, Default)]
pub struct SleepWorker;

#[async_trait]
impl Worker for SleepWorker {
    fn name(&self) -> &str {
        "sleep"
    }

    async fn execute(&self, task: &TaskDescriptor, input: &InputData) -> Result<Value, WorkerError> {
        let ms = match input.get("ms") {
            None => 0,
            Some(v) => v.as_u64().ok_or_else(|| {
                WorkerError::InvalidInput(format!("task '{}': `ms` must be a non-negative integer", task.id))
            })?,
        };

        tokio::time::sleep(Duration::from_millis(ms)).await;

        if input.get("fail").and_then(Value::as_bool).unwrap_or(false) {
            return Err(WorkerError::failed(format!("task '{}' asked to fail", task.id)));
        }
        Ok(json!({ "sleptMs": ms }))
    }
}
