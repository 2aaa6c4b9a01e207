use serde_json::{Map, Value};

use crate::worker::InputData;

/// Merge a task payload over the shared-data entries it may read.
///
/// Object payloads are merged key by key and win on collision. Any other
/// non-null payload is placed under `"payload"`.
pub(crate) fn build_input(shared: Map<String, Value>, payload: &Value) -> InputData {
    let mut input = shared;
    match payload {
        Value::Null => {}
        Value::Object(fields) => {
            for (k, v) in fields {
                input.insert(k.clone(), v.clone());
            }
        }
        other => {
            input.insert("payload".to_string(), other.clone());
        }
    }
    input
}
