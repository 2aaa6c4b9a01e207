use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    Sequential,
    Parallel,
    Hybrid,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStrategyArg {
    FailFast,
    ContinueOnError,
    RetryFailed,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Jsonl => "jsonl",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "conductor", version, about = "Run dependency-ordered, parallel and hybrid task plans")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; replaces the default lookup.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Plan file (JSON).
    pub plan: PathBuf,

    /// Override the plan's strategy.
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Override `run.error_handling.strategy`.
    #[arg(long, value_enum)]
    pub error_strategy: Option<ErrorStrategyArg>,

    /// How run events are rendered on stderr.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Show a progress bar.
    #[arg(long)]
    pub progress: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    /// Plan file (JSON).
    pub plan: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a plan and print its result as JSON.
    Run(RunArgs),
    /// Check a plan without running it.
    Validate(PlanArgs),
    /// Print the resolved step order.
    Order(PlanArgs),
}
