use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoordinationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Sequential,
    Parallel,
    Hybrid,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Order in which the parallel executor drains priority groups.
    pub const DRAIN_ORDER: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Data,
    #[default]
    Completion,
    Approval,
}

/// Per-step overrides merged over the run's retry defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetryOverride {
    #[serde(default, alias = "maxRetries")]
    pub max_retries: Option<u32>,

    #[serde(default, alias = "baseDelayMs")]
    pub base_delay_ms: Option<u64>,

    #[serde(default, alias = "backoffMultiplier")]
    pub backoff_multiplier: Option<f64>,

    #[serde(default, alias = "maxDelayMs")]
    pub max_delay_ms: Option<u64>,
}

/// A dependency-constrained unit of sequential work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,

    #[serde(alias = "workerId")]
    pub worker_id: String,

    #[serde(rename = "type", alias = "task_type", default = "default_task_type")]
    pub task_type: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub payload: Value,

    /// Prerequisite step ids declared on the step itself.
    #[serde(default, alias = "prerequisites")]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub retry: Option<RetryOverride>,

    /// Informational only.
    #[serde(default, alias = "estimatedDurationMs")]
    pub estimated_duration_ms: Option<u64>,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_task_type() -> String {
    "generic".to_string()
}

impl Step {
    pub fn new(id: impl Into<String>, worker_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            worker_id: worker_id.into(),
            task_type: default_task_type(),
            description: String::new(),
            payload: Value::Null,
            dependencies: Vec::new(),
            retry: None,
            estimated_duration_ms: None,
            metadata: Map::new(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_retry(mut self, retry: RetryOverride) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// A priority-tagged unit of concurrency-eligible work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelTask {
    pub id: String,

    #[serde(alias = "workerId")]
    pub worker_id: String,

    #[serde(rename = "type", alias = "task_type", default = "default_task_type")]
    pub task_type: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub payload: Value,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default = "default_can_run_in_parallel", alias = "canRunInParallel")]
    pub can_run_in_parallel: bool,

    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_can_run_in_parallel() -> bool {
    true
}

impl ParallelTask {
    pub fn new(id: impl Into<String>, worker_id: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: id.into(),
            worker_id: worker_id.into(),
            task_type: default_task_type(),
            description: String::new(),
            payload: Value::Null,
            priority,
            can_run_in_parallel: true,
            metadata: Map::new(),
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.can_run_in_parallel = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    #[serde(alias = "prerequisiteId", alias = "from")]
    pub prerequisite_id: String,

    #[serde(alias = "dependentId", alias = "to")]
    pub dependent_id: String,

    #[serde(default, alias = "type")]
    pub kind: DependencyKind,

    /// When false the edge only gates ordering; the prerequisite's result is
    /// not forwarded to the dependent.
    #[serde(default, alias = "transfersData")]
    pub transfers_data: bool,
}

impl DependencyEdge {
    pub fn new(prerequisite_id: impl Into<String>, dependent_id: impl Into<String>) -> Self {
        Self {
            prerequisite_id: prerequisite_id.into(),
            dependent_id: dependent_id.into(),
            kind: DependencyKind::default(),
            transfers_data: false,
        }
    }

    pub fn with_data(mut self) -> Self {
        self.kind = DependencyKind::Data;
        self.transfers_data = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub strategy: Strategy,

    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default, alias = "parallelTasks")]
    pub parallel_tasks: Vec<ParallelTask>,

    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,

    #[serde(default, alias = "estimatedDurationMs", alias = "estimatedDuration")]
    pub estimated_duration_ms: Option<u64>,
}

impl ExecutionPlan {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            steps: Vec::new(),
            parallel_tasks: Vec::new(),
            dependencies: Vec::new(),
            estimated_duration_ms: None,
        }
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_parallel_tasks(mut self, tasks: Vec<ParallelTask>) -> Self {
        self.parallel_tasks = tasks;
        self
    }

    pub fn with_dependencies(mut self, edges: Vec<DependencyEdge>) -> Self {
        self.dependencies = edges;
        self
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Every step id followed by every parallel-task id, in declaration order.
    pub fn task_ids(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| s.id.clone())
            .chain(self.parallel_tasks.iter().map(|t| t.id.clone()))
            .collect()
    }

    /// Union of the step's own prerequisite list and every edge targeting it,
    /// deduplicated, declaration order kept.
    pub fn prerequisites_of(&self, step: &Step) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let from_edges = self
            .dependencies
            .iter()
            .filter(|e| e.dependent_id == step.id)
            .map(|e| &e.prerequisite_id);
        for id in step.dependencies.iter().chain(from_edges) {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }

    /// Prerequisites whose results are forwarded into the step's input data.
    pub fn data_sources_of(&self, step: &Step) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let from_edges = self
            .dependencies
            .iter()
            .filter(|e| e.dependent_id == step.id && e.transfers_data)
            .map(|e| &e.prerequisite_id);
        for id in step.dependencies.iter().chain(from_edges) {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), CoordinationError> {
        super::validate::validate_plan(self)
    }
}
