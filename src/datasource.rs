//! Datasource Orchestration
//!
//! Per-request pipeline: macro interpolation over the raw query text,
//! builder/settings decoding, context and settings merging, engine
//! execution, shape normalization, frame building, and layout selection.
//!
//! Each sub-query in a request is processed independently and keyed by its
//! reference id; one sub-query's failure never affects its siblings.

use crate::config::Config;
use crate::context::{layer_from_values, merge_layers, ContextParameter};
use crate::engine::{CompiledQuery, EngineClient, EngineError};
use crate::frame::{apply_layout, build_frame, Frame};
use crate::interpolate::interpolate_variables;
use crate::normalize::{normalize_response, NormalizeError};
use crate::settings::QuerySettings;
use crate::variable::{metric_find_values, MetricFindValue};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// One named sub-query within a request.
#[derive(Debug, Clone)]
pub struct DataQuery {
    /// Request-scoped reference id
    pub ref_id: String,
    /// Raw query JSON (builder + settings sections)
    pub json: String,
    /// Resolution step for macro interpolation
    pub interval: Duration,
    /// Length of the requested time window
    pub range: Duration,
}

/// A request of one or more sub-queries.
#[derive(Debug, Clone, Default)]
pub struct QueryDataRequest {
    pub queries: Vec<DataQuery>,
}

/// Result for one sub-query: frames plus an optional error string, which
/// is advisory when frames are populated (row limit) and fatal when they
/// are not.
#[derive(Debug, Clone, Default)]
pub struct DataResponse {
    pub frames: Vec<Frame>,
    pub error: Option<String>,
}

impl DataResponse {
    fn failed(error: String) -> Self {
        Self {
            frames: Vec::new(),
            error: Some(error),
        }
    }
}

/// Responses keyed by sub-query reference id.
#[derive(Debug, Clone, Default)]
pub struct QueryDataResponse {
    pub responses: HashMap<String, DataResponse>,
}

/// Errors scoped to a single sub-query
#[derive(Error, Debug)]
pub enum DatasourceError {
    /// The raw query JSON could not be decoded
    #[error("malformed query: {0}")]
    MalformedQuery(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Raw query document: builder and settings sections, either of which may
/// be absent while the user is still authoring the query.
#[derive(Debug, Deserialize)]
struct RawQuery {
    #[serde(default)]
    builder: Option<Map<String, Value>>,
    #[serde(default)]
    settings: Option<Map<String, Value>>,
}

/// The bridge between dashboard requests and the analytics engine.
pub struct Datasource {
    client: EngineClient,
    default_settings: Map<String, Value>,
}

impl Datasource {
    pub fn new(client: EngineClient, default_settings: Map<String, Value>) -> Self {
        Self {
            client,
            default_settings,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let client = EngineClient::new(config.engine_config())?;
        Ok(Self::new(client, config.query.clone()))
    }

    /// Execute every sub-query of a request, collecting results by
    /// reference id. Sub-queries share no state and failures stay scoped
    /// to their own reference.
    pub async fn query_data(&self, request: &QueryDataRequest) -> QueryDataResponse {
        let mut responses = HashMap::new();
        for query in &request.queries {
            responses.insert(query.ref_id.clone(), self.query(query).await);
        }
        QueryDataResponse { responses }
    }

    /// Execute one sub-query end to end.
    pub async fn query(&self, query: &DataQuery) -> DataResponse {
        tracing::debug!(ref_id = %query.ref_id, "received query");
        let raw = interpolate_variables(&query.json, query.interval, query.range);

        match self.run_query(&query.ref_id, &raw).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(ref_id = %query.ref_id, error = %e, "query failed");
                DataResponse::failed(e.to_string())
            }
        }
    }

    async fn run_query(&self, ref_id: &str, raw: &str) -> Result<DataResponse, DatasourceError> {
        let Some((mut query, settings)) = self.prepare_query(raw)? else {
            return Ok(DataResponse::default());
        };
        query.prepare_for_execution();
        tracing::debug!(ref_id = %ref_id, query_type = %query.query_type(), "executing query");

        let result = self.client.execute(&query).await?;
        let table = normalize_response(query.query_type(), &result, &settings, ref_id)?;
        tracing::debug!(
            ref_id = %ref_id,
            columns = table.columns.len(),
            rows = table.rows.len(),
            "normalized engine response"
        );

        let built = build_frame(&table, &settings);
        let frame = apply_layout(built.frame, &settings);
        Ok(DataResponse {
            frames: vec![frame],
            error: built.warning,
        })
    }

    /// Execute a template-variable query and flatten the result into
    /// value/text pairs.
    pub async fn query_variable(
        &self,
        raw: &str,
    ) -> Result<Vec<MetricFindValue>, DatasourceError> {
        let Some((mut query, settings)) = self.prepare_query(raw)? else {
            return Ok(Vec::new());
        };
        query.prepare_for_execution();

        let result = self.client.execute(&query).await?;
        let table = normalize_response(query.query_type(), &result, &settings, "variable")?;
        Ok(metric_find_values(&table))
    }

    /// Decode the raw query document and assemble the compiled query plus
    /// its effective settings. Returns `None` when the builder or settings
    /// section is missing: that happens routinely before the user finishes
    /// authoring a query and is not an error.
    fn prepare_query(
        &self,
        raw: &str,
    ) -> Result<Option<(CompiledQuery, QuerySettings)>, DatasourceError> {
        let parsed: RawQuery = serde_json::from_str(raw)?;
        let (Some(builder), Some(query_settings)) = (parsed.builder, parsed.settings) else {
            tracing::debug!("query missing builder or settings section, nothing to execute yet");
            return Ok(None);
        };

        let default_layer = self.context_layer(&self.default_settings);
        let query_layer = self.context_layer(&query_settings);
        let context = merge_layers(&[&default_layer, &query_layer]);

        let mut query = CompiledQuery::new(builder);
        query.set_context(context);

        let settings = QuerySettings::merged(&[&self.default_settings, &query_settings]);
        Ok(Some((query, settings)))
    }

    fn context_layer(&self, settings: &Map<String, Value>) -> Vec<ContextParameter> {
        settings
            .get("contextParameters")
            .and_then(Value::as_array)
            .map(|raw| layer_from_values(raw))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use serde_json::json;

    fn datasource_with_defaults(defaults: Value) -> Datasource {
        let client = EngineClient::new(EngineConfig::default()).unwrap();
        Datasource::new(client, defaults.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_prepare_query_missing_sections_is_silent() {
        let ds = datasource_with_defaults(json!({}));
        assert!(ds.prepare_query(r#"{}"#).unwrap().is_none());
        assert!(ds
            .prepare_query(r#"{"builder": {"queryType": "scan"}}"#)
            .unwrap()
            .is_none());
        assert!(ds
            .prepare_query(r#"{"settings": {}}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_prepare_query_malformed_json_fails() {
        let ds = datasource_with_defaults(json!({}));
        let err = ds.prepare_query("{not json").unwrap_err();
        assert!(matches!(err, DatasourceError::MalformedQuery(_)));
    }

    #[test]
    fn test_prepare_query_merges_context_layers() {
        let ds = datasource_with_defaults(json!({
            "contextParameters": [
                {"name": "timeout", "value": 30000},
                {"name": "useCache", "value": true}
            ]
        }));
        let raw = json!({
            "builder": {"queryType": "timeseries"},
            "settings": {
                "contextParameters": [{"name": "timeout", "value": 5000}]
            }
        })
        .to_string();

        let (query, _) = ds.prepare_query(&raw).unwrap().unwrap();
        let context = query.body().get("context").unwrap();
        assert_eq!(context.get("timeout"), Some(&json!(5000)));
        assert_eq!(context.get("useCache"), Some(&json!(true)));
    }

    #[test]
    fn test_prepare_query_merges_settings_right_biased() {
        let ds = datasource_with_defaults(json!({"format": "long", "responseLimit": 50.0}));
        let raw = json!({
            "builder": {"queryType": "scan"},
            "settings": {"format": "log"}
        })
        .to_string();

        let (_, settings) = ds.prepare_query(&raw).unwrap().unwrap();
        assert_eq!(settings.format(), "log");
        assert_eq!(settings.response_limit(), 50);
    }

    #[test]
    fn test_empty_context_is_still_installed() {
        let ds = datasource_with_defaults(json!({}));
        let raw = json!({
            "builder": {"queryType": "scan"},
            "settings": {}
        })
        .to_string();

        let (query, _) = ds.prepare_query(&raw).unwrap().unwrap();
        assert_eq!(query.body().get("context"), Some(&json!({})));
    }
}
