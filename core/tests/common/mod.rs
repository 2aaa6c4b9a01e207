#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conductor_core::config::{ErrorStrategy, RunConfig};
use conductor_core::{
    InputData, RunEvent, RunObserver, TaskDescriptor, Worker, WorkerError, WorkerRegistry,
};
use serde_json::{json, Value};

/// Returns the task id and the input it was handed.
pub struct EchoWorker;

#[async_trait]
impl Worker for EchoWorker {
    fn name(&self) -> &str {
        "echo"
    }

    async fn execute(&self, task: &TaskDescriptor, input: &InputData) -> Result<Value, WorkerError> {
        Ok(json!({ "task": task.id, "input": Value::Object(input.clone()) }))
    }
}

/// Fails every call and counts them.
#[derive(Default)]
pub struct FailingWorker {
    calls: AtomicU32,
}

impl FailingWorker {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Worker for FailingWorker {
    fn name(&self) -> &str {
        "fail"
    }

    async fn execute(&self, task: &TaskDescriptor, _input: &InputData) -> Result<Value, WorkerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(WorkerError::failed(format!("{} exploded", task.id)))
    }
}

/// Fails the first `failures` calls, then succeeds.
pub struct FlakyWorker {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyWorker {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Worker for FlakyWorker {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn execute(&self, _task: &TaskDescriptor, _input: &InputData) -> Result<Value, WorkerError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err(WorkerError::failed(format!("transient failure #{}", n + 1)))
        } else {
            Ok(json!({ "attempt": n + 1 }))
        }
    }
}

/// Sleeps, tracking how many calls overlap.
#[derive(Default)]
pub struct SlowWorker {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    order: Mutex<Vec<String>>,
}

impl SlowWorker {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> Vec<String> {
        self.order.lock().unwrap().clone()
    }
}

#[async_trait]
impl Worker for SlowWorker {
    fn name(&self) -> &str {
        "slow"
    }

    async fn execute(&self, task: &TaskDescriptor, _input: &InputData) -> Result<Value, WorkerError> {
        self.order.lock().unwrap().push(task.id.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Value::String(task.id.clone()))
    }
}

/// Records the name of every event it sees.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingObserver {
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(RunEvent::name).collect()
    }

    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl RunObserver for RecordingObserver {
    fn name(&self) -> &str {
        "recording"
    }

    fn on_event(&self, event: &RunEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Workers used across the integration tests.
pub struct Fixture {
    pub registry: WorkerRegistry,
    pub failing: Arc<FailingWorker>,
    pub flaky: Arc<FlakyWorker>,
    pub slow: Arc<SlowWorker>,
}

pub fn fixture() -> Fixture {
    let failing = Arc::new(FailingWorker::default());
    let flaky = Arc::new(FlakyWorker::new(2));
    let slow = Arc::new(SlowWorker::default());
    let registry = WorkerRegistry::new()
        .with("echo", Arc::new(EchoWorker))
        .with("fail", failing.clone())
        .with("flaky", flaky.clone())
        .with("slow", slow.clone());
    Fixture {
        registry,
        failing,
        flaky,
        slow,
    }
}

/// Run config with millisecond backoff so retries do not slow tests down.
pub fn run_config(strategy: ErrorStrategy, max_retries: u32) -> RunConfig {
    let mut cfg = RunConfig::default();
    cfg.error_handling.strategy = strategy;
    cfg.error_handling.max_retries = max_retries;
    cfg.retry.base_delay_ms = 1;
    cfg.retry.max_delay_ms = 4;
    cfg.monitoring.progress_bar = false;
    cfg
}
