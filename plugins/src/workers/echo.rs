use async_trait::async_trait;
use conductor_core::{InputData, TaskDescriptor, Worker, WorkerError};
use serde_json::{json, Value};

/// Hands back what it was given. Useful for dry runs and wiring checks.
#[derive(Debug, Default)]
pub struct EchoWorker;

#[async_trait]
impl Worker for EchoWorker {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute(&self, task: &TaskDescriptor, input: &InputData) -> Result<Value, WorkerError> {
        tracing::debug!(task_id = %task.id, keys = input.len(), "echo");
        Ok(json!({
            "task": task.id,
            "type": task.task_type,
            "input": Value::Object(input.clone()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[tokio::test]
    async fn echoes_input_and_task_identity() {
        let task = TaskDescriptor {
            id: "t".into(),
            task_type: "generic".into(),
            description: String::new(),
            metadata: Map::new(),
        };
        let mut input = Map::new();
        input.insert("k".into(), json!(1));

        let out = EchoWorker.execute(&task, &input).await.unwrap();
        assert_eq!(out, json!({ "task": "t", "type": "generic", "input": { "k": 1 } }));
    }
}
