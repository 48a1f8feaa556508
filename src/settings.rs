//! Query Settings
//!
//! The flat, string-keyed settings bag attached to every query. Instance
//! defaults merge with per-query settings (per-query wins), and typed
//! accessors fall back to documented defaults when a key is absent or
//! carries the wrong JSON type.

use serde_json::{Map, Value};

/// Settings bag for one query execution.
#[derive(Debug, Clone, Default)]
pub struct QuerySettings {
    values: Map<String, Value>,
}

impl QuerySettings {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Merge settings layers left-to-right, later layers overwriting
    /// earlier ones on key collision.
    pub fn merged(layers: &[&Map<String, Value>]) -> Self {
        let mut values = Map::new();
        for layer in layers {
            for (k, v) in layer.iter() {
                values.insert(k.clone(), v.clone());
            }
        }
        Self { values }
    }

    /// Raw value lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Output layout: "long" (default), "wide", or "log".
    pub fn format(&self) -> &str {
        self.str_or("format", "long")
    }

    /// Drop columns whose every cell is absent or empty. Defaults to false.
    pub fn hide_empty_columns(&self) -> bool {
        self.values
            .get("hideEmptyColumns")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Row limit for one response; 0 means unlimited.
    pub fn response_limit(&self) -> usize {
        self.values
            .get("responseLimit")
            .and_then(Value::as_f64)
            .map(|v| v as usize)
            .unwrap_or(0)
    }

    /// Metadata sub-view selector.
    pub fn view(&self) -> &str {
        self.str_or("view", "base")
    }

    /// Time field name for the log layout.
    pub fn log_column_time(&self) -> &str {
        self.str_or("logColumnTime", "__time")
    }

    /// Level field name for the log layout.
    pub fn log_column_level(&self) -> &str {
        self.str_or("logColumnLevel", "level")
    }

    /// Message field name for the log layout.
    pub fn log_column_message(&self) -> &str {
        self.str_or("logColumnMessage", "message")
    }

    /// Execution-context parameters carried in this bag, if any.
    pub fn context_parameters(&self) -> Option<&Vec<Value>> {
        self.values.get("contextParameters").and_then(Value::as_array)
    }

    fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_defaults_for_empty_bag() {
        let s = QuerySettings::default();
        assert_eq!(s.format(), "long");
        assert!(!s.hide_empty_columns());
        assert_eq!(s.response_limit(), 0);
        assert_eq!(s.view(), "base");
        assert_eq!(s.log_column_time(), "__time");
        assert_eq!(s.log_column_level(), "level");
        assert_eq!(s.log_column_message(), "message");
        assert!(s.context_parameters().is_none());
    }

    #[test]
    fn test_typed_accessors() {
        let s = QuerySettings::new(map(json!({
            "format": "log",
            "hideEmptyColumns": true,
            "responseLimit": 100.0,
            "logColumnMessage": "msg",
        })));
        assert_eq!(s.format(), "log");
        assert!(s.hide_empty_columns());
        assert_eq!(s.response_limit(), 100);
        assert_eq!(s.log_column_message(), "msg");
    }

    #[test]
    fn test_mistyped_value_falls_back() {
        let s = QuerySettings::new(map(json!({"responseLimit": "many"})));
        assert_eq!(s.response_limit(), 0);
    }

    #[test]
    fn test_merge_is_right_biased() {
        let defaults = map(json!({"format": "long", "responseLimit": 50.0}));
        let overrides = map(json!({"format": "wide"}));
        let s = QuerySettings::merged(&[&defaults, &overrides]);
        assert_eq!(s.format(), "wide");
        assert_eq!(s.response_limit(), 50);
    }

    #[test]
    fn test_merge_with_empty_layer() {
        let empty = Map::new();
        let only = map(json!({"view": "aggregators"}));
        let s = QuerySettings::merged(&[&empty, &only]);
        assert_eq!(s.view(), "aggregators");
    }
}
