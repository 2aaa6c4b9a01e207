//! CLI assembly: applies command-line overrides to the loaded config, builds
//! the worker registry and renderer, then runs, validates or orders a plan.
use std::path::Path;

use conductor_core::config::{self, AppConfig, ErrorStrategy};
use conductor_core::executor::{resolve_execution_order, CoordinationEngine};
use conductor_core::{ExecutionPlan, Strategy};
use conductor_plugins::factory;

use crate::commands::cli::{ErrorStrategyArg, PlanArgs, RunArgs, StrategyArg};
use crate::error::CliError;

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Sequential => Strategy::Sequential,
            StrategyArg::Parallel => Strategy::Parallel,
            StrategyArg::Hybrid => Strategy::Hybrid,
        }
    }
}

impl From<ErrorStrategyArg> for ErrorStrategy {
    fn from(arg: ErrorStrategyArg) -> Self {
        match arg {
            ErrorStrategyArg::FailFast => ErrorStrategy::FailFast,
            ErrorStrategyArg::ContinueOnError => ErrorStrategy::ContinueOnError,
            ErrorStrategyArg::RetryFailed => ErrorStrategy::RetryFailed,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CliError> {
    let loaded = match path {
        Some(p) => config::load_from_path(p),
        None => config::load_default(),
    };
    loaded.map_err(|e| CliError::Config(format!("{e:#}")))
}

pub fn read_plan(path: &Path) -> Result<ExecutionPlan, CliError> {
    let raw = std::fs::read_to_string(path)?;
    ExecutionPlan::from_json_str(&raw)
        .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))
}

#[tracing::instrument(name = "cli.run", skip(args, cfg), fields(plan = %args.plan.display()))]
pub async fn run(args: RunArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    let mut plan = read_plan(&args.plan)?;
    if let Some(strategy) = args.strategy {
        plan.strategy = strategy.into();
    }
    if let Some(strategy) = args.error_strategy {
        cfg.run.error_handling.strategy = strategy.into();
    }
    if args.progress {
        cfg.run.monitoring.progress_bar = true;
    }

    let engine = CoordinationEngine::builder(factory::build_registry(&cfg))
        .config(cfg.run.clone())
        .observer(factory::build_observer(args.format.as_str()))
        .build();

    let result = engine.execute(&plan).await?;
    let rendered = serde_json::to_string_pretty(&result).map_err(anyhow::Error::from)?;
    println!("{rendered}");

    Ok(if result.success { 0 } else { 1 })
}

/// Everything `run` checks up front, without executing a task.
pub fn validate(args: &PlanArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let plan = read_plan(&args.plan)?;
    plan.validate()?;
    factory::build_registry(cfg).resolve(&plan)?;
    resolve_execution_order(&plan.steps, &plan.dependencies)?;

    println!(
        "plan ok: strategy {}, {} steps, {} parallel tasks",
        plan.strategy.as_str(),
        plan.steps.len(),
        plan.parallel_tasks.len()
    );
    Ok(0)
}

pub fn order(args: &PlanArgs) -> Result<i32, CliError> {
    let plan = read_plan(&args.plan)?;
    plan.validate()?;
    for step in resolve_execution_order(&plan.steps, &plan.dependencies)? {
        println!("{}", step.id);
    }
    Ok(0)
}
