use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::RunConfig;
use crate::context::{CoordinationContext, TaskState};
use crate::error::CoordinationError;
use crate::plan::{ExecutionPlan, Step, Strategy};
use crate::worker::{ResolvedWorkers, WorkerRegistry};

use super::aggregate::aggregate;
use super::graph::resolve_execution_order;
use super::hybrid::HybridExecutor;
use super::parallel::ParallelExecutor;
use super::progress::ProgressMonitor;
use super::report::RunReporter;
use super::retry::RetryPolicy;
use super::sequential::SequentialExecutor;
use super::traits::RunObserver;
use super::types::{ExecutionResult, PhaseOutcome};

/// Drives execution plans against a fixed worker registry.
///
/// The engine itself holds no per-run state: every call to [`execute`] or
/// [`start`] builds a fresh [`CoordinationContext`], so one engine can run
/// several plans concurrently.
///
/// [`execute`]: CoordinationEngine::execute
/// [`start`]: CoordinationEngine::start
#[derive(Clone)]
pub struct CoordinationEngine {
    registry: WorkerRegistry,
    config: RunConfig,
    observers: Vec<Arc<dyn RunObserver>>,
}

pub struct CoordinationEngineBuilder {
    registry: WorkerRegistry,
    config: RunConfig,
    observers: Vec<Arc<dyn RunObserver>>,
}

/// Everything checked before a run is allowed to touch any task.
struct Prepared {
    plan: ExecutionPlan,
    ordered: Vec<Step>,
    workers: ResolvedWorkers,
}

impl CoordinationEngine {
    pub fn new(registry: WorkerRegistry, config: RunConfig) -> Self {
        Self {
            registry,
            config,
            observers: Vec::new(),
        }
    }

    pub fn builder(registry: WorkerRegistry) -> CoordinationEngineBuilder {
        CoordinationEngineBuilder::new(registry)
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    /// Run `plan` to completion.
    ///
    /// Configuration problems (duplicate ids, unknown prerequisites or
    /// workers, cycles) come back as `Err` before any task starts. Task
    /// failures and aborts are reported inside the returned result.
    pub async fn execute(&self, plan: &ExecutionPlan) -> Result<ExecutionResult, CoordinationError> {
        let prepared = self.prepare(plan.clone())?;
        let ctx = CoordinationContext::new(Uuid::new_v4().to_string(), &prepared.plan, &self.config);
        Ok(self.drive(&ctx, &prepared).await)
    }

    /// Spawn `plan` onto the current tokio runtime and return immediately.
    ///
    /// Validation still happens up front, so a bad plan fails here rather
    /// than inside the spawned task.
    pub fn start(&self, plan: ExecutionPlan) -> Result<RunHandle, CoordinationError> {
        let prepared = self.prepare(plan)?;
        let run_id = Uuid::new_v4().to_string();
        let context = Arc::new(CoordinationContext::new(
            run_id.clone(),
            &prepared.plan,
            &self.config,
        ));

        let engine = self.clone();
        let ctx = context.clone();
        let join = tokio::spawn(async move { engine.drive(&ctx, &prepared).await });

        Ok(RunHandle {
            run_id,
            context,
            join,
        })
    }

    fn prepare(&self, plan: ExecutionPlan) -> Result<Prepared, CoordinationError> {
        plan.validate()?;
        let workers = self.registry.resolve(&plan)?;
        let ordered = match plan.strategy {
            Strategy::Sequential | Strategy::Hybrid => {
                resolve_execution_order(&plan.steps, &plan.dependencies)?
            }
            Strategy::Parallel => Vec::new(),
        };
        Ok(Prepared {
            plan,
            ordered,
            workers,
        })
    }

    async fn drive(&self, ctx: &CoordinationContext, prepared: &Prepared) -> ExecutionResult {
        let plan = &prepared.plan;
        let scheduled = ctx.scheduled_ids();

        let monitoring = ctx.monitoring();
        let observers = if monitoring.enabled && monitoring.emit_events {
            self.observers.clone()
        } else {
            Vec::new()
        };
        let progress = (monitoring.enabled && monitoring.progress_bar)
            .then(|| ProgressMonitor::new(scheduled.len(), true));
        let reporter = RunReporter::new(ctx.run_id(), observers, progress);
        let defaults = RetryPolicy::from_run_config(&self.config);

        reporter.run_start(plan.strategy, scheduled.len());

        let sequential = SequentialExecutor {
            ctx,
            workers: &prepared.workers,
            defaults: &defaults,
            reporter: &reporter,
        };
        let parallel = ParallelExecutor {
            ctx,
            workers: &prepared.workers,
            defaults: &defaults,
            reporter: &reporter,
        };

        let outcome: PhaseOutcome = match plan.strategy {
            Strategy::Sequential => sequential.run(plan, &prepared.ordered).await,
            Strategy::Parallel => parallel.run(&plan.parallel_tasks).await,
            Strategy::Hybrid => {
                HybridExecutor {
                    sequential,
                    parallel,
                }
                .run(plan, &prepared.ordered)
                .await
            }
        };

        if let Some(err) = &outcome.aborted {
            let handling = ctx.error_handling();
            if handling.skip_unreached {
                let skipped = ctx.skip_pending(&scheduled);
                tracing::debug!(run_id = ctx.run_id(), skipped, "unreached tasks marked skipped");
            }
            tracing::error!(
                run_id = ctx.run_id(),
                error = %err,
                escalation_path = ?handling.escalation_path,
                notification_channels = ?handling.notification_channels,
                "run aborted"
            );
        }

        ctx.finish();
        let result = aggregate(ctx, outcome.aborted.as_ref());
        reporter.run_end(&result);
        result
    }
}

impl CoordinationEngineBuilder {
    pub fn new(registry: WorkerRegistry) -> Self {
        Self {
            registry,
            config: RunConfig::default(),
            observers: Vec::new(),
        }
    }

    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> CoordinationEngine {
        CoordinationEngine {
            registry: self.registry,
            config: self.config,
            observers: self.observers,
        }
    }
}

/// A run spawned by [`CoordinationEngine::start`].
#[derive(Debug)]
pub struct RunHandle {
    run_id: String,
    context: Arc<CoordinationContext>,
    join: JoinHandle<ExecutionResult>,
}

impl RunHandle {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Point-in-time copy of every task's state.
    pub fn snapshot(&self) -> BTreeMap<String, TaskState> {
        self.context.snapshot()
    }

    pub fn context(&self) -> &CoordinationContext {
        &self.context
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run and return its aggregated result.
    pub async fn join(self) -> Result<ExecutionResult, CoordinationError> {
        self.join
            .await
            .map_err(|e| CoordinationError::Interrupted(format!("run {}: {e}", self.run_id)))
    }
}
