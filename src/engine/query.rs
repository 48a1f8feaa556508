//! Compiled Query
//!
//! The engine-native query payload is consumed as an opaque JSON object
//! carrying a `queryType` tag. Tessera never interprets the payload beyond
//! the tag, the execution context slot, and the pre-execution result-format
//! tweaks the response adapters rely on.

use serde_json::{json, Map, Value};

/// An engine-native query body with its type tag.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    body: Map<String, Value>,
}

impl CompiledQuery {
    pub fn new(body: Map<String, Value>) -> Self {
        Self { body }
    }

    /// The query-type tag, empty when the payload carries none.
    pub fn query_type(&self) -> &str {
        self.body
            .get("queryType")
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Install the merged execution context for this invocation.
    pub fn set_context(&mut self, context: Map<String, Value>) {
        self.body.insert("context".to_string(), Value::Object(context));
    }

    /// Adjust result formats the response adapters depend on: tabular
    /// queries return an array result with a leading header row, scans a
    /// compacted row list.
    pub fn prepare_for_execution(&mut self) {
        match self.query_type() {
            "sql" => {
                self.body
                    .insert("resultFormat".to_string(), json!("array"));
                self.body.insert("header".to_string(), json!(true));
            }
            "scan" => {
                self.body
                    .insert("resultFormat".to_string(), json!("compactedList"));
            }
            _ => {}
        }
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }
}
