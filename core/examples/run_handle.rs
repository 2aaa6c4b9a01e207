//! Start a hybrid plan in the background, poll its task states, then join.
//!
//! ```text
//! cargo run -p conductor-core --example run_handle
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conductor_core::{
    CoordinationEngine, ExecutionPlan, InputData, ParallelTask, Priority, RunConfig, Step,
    Strategy, TaskDescriptor, Worker, WorkerError, WorkerRegistry,
};
use serde_json::{json, Value};

/// Pretends to work for `ms` milliseconds and reports which inputs it saw.
struct Napper;

#[async_trait]
impl Worker for Napper {
    fn name(&self) -> &str {
        "napper"
    }

    async fn execute(&self, task: &TaskDescriptor, input: &InputData) -> Result<Value, WorkerError> {
        let ms = input.get("ms").and_then(Value::as_u64).unwrap_or(50);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "task": task.id, "inputs": input.keys().collect::<Vec<_>>() }))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("conductor_core=debug")
        .with_writer(std::io::stderr)
        .init();

    let registry = WorkerRegistry::new().with("napper", Arc::new(Napper));
    let engine = CoordinationEngine::new(registry, RunConfig::default());

    let plan = ExecutionPlan::new(Strategy::Hybrid)
        .with_steps(vec![
            Step::new("fetch", "napper").with_payload(json!({ "ms": 120 })),
            Step::new("transform", "napper").depends_on(["fetch"]),
        ])
        .with_parallel_tasks(vec![
            ParallelTask::new("publish", "napper", Priority::High),
            ParallelTask::new("archive", "napper", Priority::Low),
        ]);

    let handle = engine.start(plan)?;
    println!("started run {}", handle.run_id());

    while !handle.is_finished() {
        let states: Vec<String> = handle
            .snapshot()
            .iter()
            .map(|(id, s)| format!("{id}={}", s.status.as_str()))
            .collect();
        println!("  {}", states.join(" "));
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    let result = handle.join().await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
