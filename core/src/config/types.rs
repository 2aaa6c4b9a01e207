use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "conductor_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// Per-run policies handed to the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default, alias = "errorHandling")]
    pub error_handling: ErrorHandlingConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Deadline for a single worker attempt. Unset means no deadline.
    #[serde(default, alias = "taskTimeoutMs")]
    pub task_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStrategy {
    FailFast,
    #[default]
    ContinueOnError,
    RetryFailed,
}

impl ErrorStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FailFast => "fail_fast",
            Self::ContinueOnError => "continue_on_error",
            Self::RetryFailed => "retry_failed",
        }
    }
}

impl FromStr for ErrorStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(Self::FailFast),
            "continue_on_error" => Ok(Self::ContinueOnError),
            "retry_failed" => Ok(Self::RetryFailed),
            other => Err(format!("unknown error strategy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    #[serde(default)]
    pub strategy: ErrorStrategy,

    #[serde(default = "default_max_retries", alias = "maxRetries")]
    pub max_retries: u32,

    #[serde(default, alias = "escalationPath")]
    pub escalation_path: Vec<String>,

    #[serde(default, alias = "notificationChannels")]
    pub notification_channels: Vec<String>,

    /// After a fail-fast abort, move tasks that were never scheduled to `skipped`.
    #[serde(default, alias = "skipUnreached")]
    pub skip_unreached: bool,
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ErrorHandlingConfig {
    fn default() -> Self {
        Self {
            strategy: ErrorStrategy::default(),
            max_retries: default_max_retries(),
            escalation_path: Vec::new(),
            notification_channels: Vec::new(),
            skip_unreached: false,
        }
    }
}

/// Backoff defaults. The attempt budget lives in `ErrorHandlingConfig::max_retries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_base_delay_ms", alias = "baseDelayMs")]
    pub base_delay_ms: u64,

    #[serde(default = "default_backoff_multiplier", alias = "backoffMultiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_delay_ms", alias = "maxDelayMs")]
    pub max_delay_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Observability switches. None of them change run outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, alias = "progressBar")]
    pub progress_bar: bool,

    #[serde(default = "default_true", alias = "emitEvents")]
    pub emit_events: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            progress_bar: false,
            emit_events: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkersConfig {
    #[serde(default)]
    pub shell: ShellWorkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellWorkerConfig {
    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default)]
    pub default_timeout_ms: Option<u64>,
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for ShellWorkerConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            default_timeout_ms: None,
        }
    }
}
