use std::sync::Arc;

use conductor_core::config::AppConfig;
use conductor_core::{RunObserver, WorkerRegistry};

use crate::renderers::{JsonlRenderer, TextRenderer};
use crate::workers::{EchoWorker, ShellWorker, SleepWorker};

/// Registry with every built-in worker, keyed by the id plans refer to.
pub fn build_registry(cfg: &AppConfig) -> WorkerRegistry {
    WorkerRegistry::new()
        .with("echo", Arc::new(EchoWorker))
        .with("shell", Arc::new(ShellWorker::new(&cfg.workers.shell)))
        .with("sleep", Arc::new(SleepWorker))
}

pub fn build_observer(format: &str) -> Arc<dyn RunObserver> {
    match format {
        "jsonl" => Arc::new(JsonlRenderer::new(false)),
        // Anything other than jsonl renders as text.
        _ => Arc::new(TextRenderer::new(!supports_unicode())),
    }
}

fn supports_unicode() -> bool {
    std::env::var("LANG")
        .or_else(|_| std::env::var("LC_ALL"))
        .map(|v| v.to_ascii_uppercase().contains("UTF-8") || v.to_ascii_uppercase().contains("UTF8"))
        .unwrap_or(false)
}
