//! Execution Context Merging
//!
//! Query execution parameters arrive as ordered layers of `{name, value}`
//! pairs: instance-level defaults first, then per-query overrides. Layers
//! fold left-to-right into a single flat mapping, last write wins per key.
//! The merged context is built fresh per invocation and never mutated
//! afterwards.

use serde::Deserialize;
use serde_json::{Map, Value};

/// One named execution parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct ContextParameter {
    pub name: String,
    pub value: Value,
}

/// Flatten one layer of parameters into a mapping.
pub fn layer_to_map(parameters: &[ContextParameter]) -> Map<String, Value> {
    let mut map = Map::new();
    for p in parameters {
        map.insert(p.name.clone(), p.value.clone());
    }
    map
}

/// Decode a layer from its raw JSON list form; entries without a string
/// `name` are skipped rather than failing the layer.
pub fn layer_from_values(raw: &[Value]) -> Vec<ContextParameter> {
    raw.iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

/// Merge ordered layers into one context mapping, later layers overwriting
/// earlier ones. An empty layer list yields an empty context.
pub fn merge_layers(layers: &[&[ContextParameter]]) -> Map<String, Value> {
    let mut merged = Map::new();
    for layer in layers {
        merged.append(&mut layer_to_map(layer));
    }
    merged
}
