use chrono::Local;
use conductor_core::{RunEvent, RunObserver};
use serde_json::{json, Map, Value};

/// One JSON object per run event on stderr, stdout being reserved for the
/// final result.
pub struct JsonlRenderer {
    pretty_print: bool,
}

impl JsonlRenderer {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RunEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        let mut metadata = match serde_json::to_value(event) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        metadata.remove("event");
        metadata.remove("run_id");
        let task_id = metadata.remove("task_id");

        let mut out = json!({
            "v": 1,
            "event_type": event.name(),
            "ts": ts,
            "run_id": event.run_id(),
        });
        if let Some(task_id) = task_id {
            out["task_id"] = task_id;
        }
        out["metadata"] = Value::Object(metadata);
        out
    }
}

impl RunObserver for JsonlRenderer {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn on_event(&self, event: &RunEvent) {
        let value = self.event_to_json(event);
        let line = if self.pretty_print {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        eprintln!("{}", line.unwrap_or_else(|_| "{}".into()));
    }
}
