use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoordinationError, WorkerError};
use crate::plan::{ExecutionPlan, ParallelTask, Step};

/// Input handed to a worker: prerequisite results merged with the task payload.
pub type InputData = Map<String, Value>;

/// What a worker is told about the task it executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub description: String,
    pub metadata: Map<String, Value>,
}

impl From<&Step> for TaskDescriptor {
    fn from(step: &Step) -> Self {
        Self {
            id: step.id.clone(),
            task_type: step.task_type.clone(),
            description: step.description.clone(),
            metadata: step.metadata.clone(),
        }
    }
}

impl From<&ParallelTask> for TaskDescriptor {
    fn from(task: &ParallelTask) -> Self {
        Self {
            id: task.id.clone(),
            task_type: task.task_type.clone(),
            description: task.description.clone(),
            metadata: task.metadata.clone(),
        }
    }
}

/// An independently executable worker.
///
/// Implementations must return an error rather than hang on input they cannot
/// handle; the engine only bounds an attempt when a task timeout is configured.
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(&self, task: &TaskDescriptor, input: &InputData)
        -> Result<Value, WorkerError>;
}

/// Explicit `workerId -> Worker` table passed to the engine at construction.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<String, Arc<dyn Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `worker` under `id`, replacing any previous entry.
    pub fn register(&mut self, id: impl Into<String>, worker: Arc<dyn Worker>) -> &mut Self {
        self.workers.insert(id.into(), worker);
        self
    }

    pub fn with(mut self, id: impl Into<String>, worker: Arc<dyn Worker>) -> Self {
        self.register(id, worker);
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Worker>> {
        self.workers.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.workers.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workers.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Looks up every worker the plan references, once, before the run starts.
    pub fn resolve(&self, plan: &ExecutionPlan) -> Result<ResolvedWorkers, CoordinationError> {
        let mut by_task = HashMap::new();
        let refs = plan
            .steps
            .iter()
            .map(|s| (&s.id, &s.worker_id))
            .chain(plan.parallel_tasks.iter().map(|t| (&t.id, &t.worker_id)));

        for (task_id, worker_id) in refs {
            let worker = self
                .get(worker_id)
                .ok_or_else(|| CoordinationError::UnknownWorker {
                    task_id: task_id.clone(),
                    worker_id: worker_id.clone(),
                })?;
            by_task.insert(task_id.clone(), worker);
        }

        Ok(ResolvedWorkers { by_task })
    }
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("workers", &self.ids())
            .finish()
    }
}

/// Workers bound to task ids for one run.
#[derive(Clone)]
pub struct ResolvedWorkers {
    by_task: HashMap<String, Arc<dyn Worker>>,
}

impl ResolvedWorkers {
    pub fn for_task(&self, task_id: &str) -> Result<Arc<dyn Worker>, CoordinationError> {
        self.by_task
            .get(task_id)
            .cloned()
            .ok_or_else(|| CoordinationError::UnknownTask(task_id.to_string()))
    }
}
