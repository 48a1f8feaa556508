//! Response Shape Adapters
//!
//! The analytics engine answers each query type with a structurally
//! different JSON shape. One adapter per type tag reduces its shape to a
//! [`NormalizedTable`]; a registry maps the tag to the adapter so dispatch
//! stays closed and testable.
//!
//! Every adapter tolerates an empty or malformed response by returning an
//! empty table: "no data in range" is routine, not an error. The only
//! structural failure that aborts a sub-query is an interval column name
//! that cannot be parsed back in the metadata base view.

use crate::normalize::infer::infer_column_type;
use crate::normalize::table::{Cell, Column, NormalizedTable};
use crate::settings::QuerySettings;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while normalizing an engine response
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// The query-type tag has no registered adapter
    #[error("unknown query type: {0}")]
    UnknownQueryType(String),

    /// A synthetic interval column name failed to parse back
    #[error("malformed interval column name: {0}")]
    IntervalColumn(String),
}

/// Adapter from one engine response shape to the uniform table form.
pub trait ShapeAdapter: Send + Sync {
    fn parse(
        &self,
        raw: &Value,
        settings: &QuerySettings,
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError>;
}

static REGISTRY: Lazy<HashMap<&'static str, &'static (dyn ShapeAdapter)>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static (dyn ShapeAdapter)> = HashMap::new();
    m.insert("sql", &SqlAdapter);
    m.insert("timeseries", &TimeseriesAdapter);
    m.insert("topN", &RankedListAdapter);
    m.insert("search", &RankedListAdapter);
    m.insert("groupBy", &GroupByAdapter);
    m.insert("timeBoundary", &TimeBoundaryAdapter);
    m.insert("dataSourceMetadata", &DataSourceMetadataAdapter);
    m.insert("scan", &ScanAdapter);
    m.insert("segmentMetadata", &SegmentMetadataAdapter);
    m
});

/// Look up the adapter registered for a query-type tag.
pub fn adapter_for(query_type: &str) -> Option<&'static dyn ShapeAdapter> {
    REGISTRY.get(query_type).copied()
}

/// Normalize a raw engine response by its query-type tag.
pub fn normalize_response(
    query_type: &str,
    raw: &Value,
    settings: &QuerySettings,
    reference: &str,
) -> Result<NormalizedTable, NormalizeError> {
    let adapter = adapter_for(query_type)
        .ok_or_else(|| NormalizeError::UnknownQueryType(query_type.to_string()))?;
    adapter.parse(raw, settings, reference)
}

/// Build the final table: one inference pass per column over the full row
/// set, column order as discovered.
fn finish(reference: &str, names: Vec<String>, rows: Vec<Vec<Cell>>) -> NormalizedTable {
    let columns = names
        .iter()
        .enumerate()
        .map(|(pos, name)| Column {
            name: name.clone(),
            column_type: infer_column_type(name, pos, &rows),
        })
        .collect();
    NormalizedTable {
        reference: reference.to_string(),
        columns,
        rows,
    }
}

fn cell_at(record: &Map<String, Value>, key: &str) -> Cell {
    record.get(key).map(Cell::from).unwrap_or(Cell::Nil)
}

/// Tabular-with-header: the first element of the result array carries the
/// column names, every following element is a data row.
struct SqlAdapter;

impl ShapeAdapter for SqlAdapter {
    fn parse(
        &self,
        raw: &Value,
        _settings: &QuerySettings,
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError> {
        let Some(records) = raw.as_array() else {
            return Ok(NormalizedTable::empty(reference));
        };
        let Some((header, data)) = records.split_first() else {
            return Ok(NormalizedTable::empty(reference));
        };
        let Some(header) = header.as_array() else {
            return Ok(NormalizedTable::empty(reference));
        };
        if data.is_empty() {
            return Ok(NormalizedTable::empty(reference));
        }

        let names: Vec<String> = header
            .iter()
            .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
            .collect();
        let rows: Vec<Vec<Cell>> = data
            .iter()
            .filter_map(Value::as_array)
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();

        Ok(finish(reference, names, rows))
    }
}

/// Shared shape for responses carrying one nested object per time bucket:
/// column 0 is the bucket timestamp, remaining columns come from the first
/// record's nested object keys. When `fill_missing_timestamp` is set, a
/// record without a timestamp (a grand-total bucket) takes the prior row's
/// timestamp instead of staying absent.
fn bucketed_object(
    raw: &Value,
    nested_key: &str,
    fill_missing_timestamp: bool,
    reference: &str,
) -> NormalizedTable {
    let Some(records) = raw.as_array() else {
        return NormalizedTable::empty(reference);
    };
    let Some(first) = records.first().and_then(Value::as_object) else {
        return NormalizedTable::empty(reference);
    };
    let Some(first_nested) = first.get(nested_key).and_then(Value::as_object) else {
        return NormalizedTable::empty(reference);
    };

    let mut names = vec!["timestamp".to_string()];
    names.extend(first_nested.keys().cloned());

    let mut rows: Vec<Vec<Cell>> = Vec::with_capacity(records.len());
    for record in records.iter().filter_map(Value::as_object) {
        let mut timestamp = cell_at(record, "timestamp");
        if timestamp == Cell::Nil && fill_missing_timestamp {
            if let Some(prev) = rows.last() {
                timestamp = prev[0].clone();
            }
        }
        let mut row = vec![timestamp];
        let nested = record.get(nested_key).and_then(Value::as_object);
        for name in &names[1..] {
            row.push(nested.map(|n| cell_at(n, name)).unwrap_or(Cell::Nil));
        }
        rows.push(row);
    }

    finish(reference, names, rows)
}

/// Time-bucketed aggregation: one record per bucket with a nested `result`
/// object; grand-total records inherit the prior bucket's timestamp.
struct TimeseriesAdapter;

impl ShapeAdapter for TimeseriesAdapter {
    fn parse(
        &self,
        raw: &Value,
        _settings: &QuerySettings,
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError> {
        Ok(bucketed_object(raw, "result", true, reference))
    }
}

/// Grouped aggregation: like timeseries but nested under `event`.
struct GroupByAdapter;

impl ShapeAdapter for GroupByAdapter {
    fn parse(
        &self,
        raw: &Value,
        _settings: &QuerySettings,
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError> {
        Ok(bucketed_object(raw, "event", false, reference))
    }
}

struct TimeBoundaryAdapter;

impl ShapeAdapter for TimeBoundaryAdapter {
    fn parse(
        &self,
        raw: &Value,
        _settings: &QuerySettings,
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError> {
        Ok(bucketed_object(raw, "result", false, reference))
    }
}

struct DataSourceMetadataAdapter;

impl ShapeAdapter for DataSourceMetadataAdapter {
    fn parse(
        &self,
        raw: &Value,
        _settings: &QuerySettings,
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError> {
        Ok(bucketed_object(raw, "result", false, reference))
    }
}

/// Ranked/grouped list: one record per bucket holding a list of per-rank
/// result objects; every inner object becomes its own row sharing the
/// parent bucket's timestamp. Serves both the topN and search tags.
struct RankedListAdapter;

impl ShapeAdapter for RankedListAdapter {
    fn parse(
        &self,
        raw: &Value,
        _settings: &QuerySettings,
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError> {
        let Some(records) = raw.as_array() else {
            return Ok(NormalizedTable::empty(reference));
        };
        let first_inner = records
            .first()
            .and_then(Value::as_object)
            .and_then(|r| r.get("result"))
            .and_then(Value::as_array)
            .and_then(|list| list.first())
            .and_then(Value::as_object);
        let Some(first_inner) = first_inner else {
            return Ok(NormalizedTable::empty(reference));
        };

        let mut names = vec!["timestamp".to_string()];
        names.extend(first_inner.keys().cloned());

        let mut rows = Vec::new();
        for record in records.iter().filter_map(Value::as_object) {
            let timestamp = cell_at(record, "timestamp");
            let inner = record.get("result").and_then(Value::as_array);
            for entry in inner.into_iter().flatten().filter_map(Value::as_object) {
                let mut row = vec![timestamp.clone()];
                for name in &names[1..] {
                    row.push(cell_at(entry, name));
                }
                rows.push(row);
            }
        }

        Ok(finish(reference, names, rows))
    }
}

/// Flat scan: a single record declaring its column names and carrying rows
/// as plain arrays; both are taken verbatim.
struct ScanAdapter;

impl ShapeAdapter for ScanAdapter {
    fn parse(
        &self,
        raw: &Value,
        _settings: &QuerySettings,
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError> {
        let Some(first) = raw
            .as_array()
            .and_then(|records| records.first())
            .and_then(Value::as_object)
        else {
            return Ok(NormalizedTable::empty(reference));
        };
        let Some(declared) = first.get("columns").and_then(Value::as_array) else {
            return Ok(NormalizedTable::empty(reference));
        };

        let names: Vec<String> = declared
            .iter()
            .map(|c| c.as_str().map(str::to_string).unwrap_or_else(|| c.to_string()))
            .collect();
        let rows: Vec<Vec<Cell>> = first
            .get("events")
            .and_then(Value::as_array)
            .map(|events| {
                events
                    .iter()
                    .filter_map(Value::as_array)
                    .map(|row| row.iter().map(Cell::from).collect())
                    .collect()
            })
            .unwrap_or_default();

        Ok(finish(reference, names, rows))
    }
}

/// Metadata with sub-views: one descriptive record per target, reshaped by
/// the `view` setting. The base view flattens interval pairs into
/// `interval_start_N`/`interval_stop_N` columns; the aggregators and
/// columns views pivot a nested map into one row per entry; timestampspec
/// exposes the timestamp spec object directly.
struct SegmentMetadataAdapter;

impl ShapeAdapter for SegmentMetadataAdapter {
    fn parse(
        &self,
        raw: &Value,
        settings: &QuerySettings,
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError> {
        let Some(records) = raw.as_array() else {
            return Ok(NormalizedTable::empty(reference));
        };
        let records: Vec<&Map<String, Value>> =
            records.iter().filter_map(Value::as_object).collect();
        let Some(first) = records.first() else {
            return Ok(NormalizedTable::empty(reference));
        };

        match settings.view() {
            "base" => Self::base_view(first, &records, reference),
            "aggregators" => Ok(Self::map_view(&records, "aggregators", "aggregator", reference)),
            "columns" => Ok(Self::map_view(&records, "columns", "column", reference)),
            "timestampspec" => Ok(Self::timestamp_spec_view(first, &records, reference)),
            _ => Ok(NormalizedTable::empty(reference)),
        }
    }
}

impl SegmentMetadataAdapter {
    fn base_view(
        first: &Map<String, Value>,
        records: &[&Map<String, Value>],
        reference: &str,
    ) -> Result<NormalizedTable, NormalizeError> {
        let mut names = Vec::new();
        for (key, value) in first.iter() {
            if key == "aggregators" || key == "columns" || key == "timestampSpec" {
                continue;
            }
            if key == "intervals" {
                let count = value.as_array().map(Vec::len).unwrap_or(0);
                for i in 0..count {
                    names.push(format!("interval_start_{i}"));
                    names.push(format!("interval_stop_{i}"));
                }
            } else {
                names.push(key.clone());
            }
        }

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut row = Vec::with_capacity(names.len());
            for name in &names {
                if name.starts_with("interval_") {
                    row.push(Self::interval_cell(record, name)?);
                } else {
                    row.push(cell_at(record, name));
                }
            }
            rows.push(row);
        }

        Ok(finish(reference, names, rows))
    }

    /// Resolve an `interval_{start|stop}_{idx}` column for one record by
    /// splitting the record's idx-th interval on `/`.
    fn interval_cell(
        record: &Map<String, Value>,
        name: &str,
    ) -> Result<Cell, NormalizeError> {
        let parts: Vec<&str> = name.split('_').collect();
        if parts.len() != 3 {
            return Err(NormalizeError::IntervalColumn(name.to_string()));
        }
        let side = if parts[1] == "stop" { 1 } else { 0 };
        let idx: usize = parts[2]
            .parse()
            .map_err(|_| NormalizeError::IntervalColumn(name.to_string()))?;

        let interval = record
            .get("intervals")
            .and_then(Value::as_array)
            .and_then(|list| list.get(idx))
            .and_then(Value::as_str);
        Ok(interval
            .and_then(|s| s.split('/').nth(side))
            .map(|s| Cell::Str(s.to_string()))
            .unwrap_or(Cell::Nil))
    }

    /// Pivot a nested name->definition map into one row per entry, with a
    /// leading column holding the entry name.
    fn map_view(
        records: &[&Map<String, Value>],
        map_key: &str,
        label: &str,
        reference: &str,
    ) -> NormalizedTable {
        let first_entry = records
            .first()
            .and_then(|r| r.get(map_key))
            .and_then(Value::as_object)
            .and_then(|m| m.values().next())
            .and_then(Value::as_object);
        let Some(first_entry) = first_entry else {
            return NormalizedTable::empty(reference);
        };

        let mut names = vec![label.to_string()];
        names.extend(first_entry.keys().cloned());

        let mut rows = Vec::new();
        for record in records {
            let entries = record.get(map_key).and_then(Value::as_object);
            for (entry_name, definition) in entries.into_iter().flatten() {
                let definition = definition.as_object();
                let mut row = Vec::with_capacity(names.len());
                for name in &names {
                    if name == label {
                        row.push(Cell::Str(entry_name.clone()));
                    } else {
                        row.push(
                            definition.map(|d| cell_at(d, name)).unwrap_or(Cell::Nil),
                        );
                    }
                }
                rows.push(row);
            }
        }

        finish(reference, names, rows)
    }

    fn timestamp_spec_view(
        first: &Map<String, Value>,
        records: &[&Map<String, Value>],
        reference: &str,
    ) -> NormalizedTable {
        let Some(spec) = first.get("timestampSpec").and_then(Value::as_object) else {
            return NormalizedTable::empty(reference);
        };
        let names: Vec<String> = spec.keys().cloned().collect();

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let spec = record.get("timestampSpec").and_then(Value::as_object);
            let row = names
                .iter()
                .map(|name| spec.map(|s| cell_at(s, name)).unwrap_or(Cell::Nil))
                .collect();
            rows.push(row);
        }

        finish(reference, names, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::table::ColumnType;
    use serde_json::json;

    fn settings_with_view(view: &str) -> QuerySettings {
        QuerySettings::new(
            json!({ "view": view })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        )
    }

    fn names(table: &NormalizedTable) -> Vec<&str> {
        table.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_sql_header_row_becomes_columns() {
        let raw = json!([
            ["__time", "channel", "count"],
            ["2023-11-14T22:13:20.000Z", "#en", "10"],
            ["2023-11-14T22:14:20.000Z", "#fr", "7"]
        ]);
        let table = normalize_response("sql", &raw, &QuerySettings::default(), "A").unwrap();
        assert_eq!(names(&table), vec!["__time", "channel", "count"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.columns[0].column_type, ColumnType::Time);
        assert_eq!(table.columns[1].column_type, ColumnType::String);
        assert_eq!(table.columns[2].column_type, ColumnType::Int);
    }

    #[test]
    fn test_sql_header_only_is_empty() {
        let raw = json!([["a", "b"]]);
        let table = normalize_response("sql", &raw, &QuerySettings::default(), "A").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_timeseries_synthetic_timestamp_first() {
        let raw = json!([
            {"timestamp": "2023-11-14T22:13:20.000Z", "result": {"count": 4.0}},
            {"timestamp": "2023-11-14T22:14:20.000Z", "result": {"count": 6.0}}
        ]);
        let table =
            normalize_response("timeseries", &raw, &QuerySettings::default(), "A").unwrap();
        assert_eq!(names(&table)[0], "timestamp");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].len(), table.columns.len());
    }

    #[test]
    fn test_timeseries_grand_total_takes_prior_timestamp() {
        let raw = json!([
            {"timestamp": "2023-11-14T22:13:20.000Z", "result": {"count": 4.0}},
            {"timestamp": null, "result": {"count": 10.0}}
        ]);
        let table =
            normalize_response("timeseries", &raw, &QuerySettings::default(), "A").unwrap();
        assert_eq!(
            table.rows[1][0],
            Cell::Str("2023-11-14T22:13:20.000Z".to_string())
        );
    }

    #[test]
    fn test_group_by_keeps_missing_timestamp_absent() {
        let raw = json!([
            {"timestamp": null, "event": {"channel": "#en", "count": 3.0}}
        ]);
        let table = normalize_response("groupBy", &raw, &QuerySettings::default(), "A").unwrap();
        assert_eq!(table.rows[0][0], Cell::Nil);
        assert!(names(&table).contains(&"channel"));
    }

    #[test]
    fn test_ranked_list_flattens_inner_entries() {
        let raw = json!([
            {
                "timestamp": "2023-11-14T22:13:20.000Z",
                "result": [
                    {"channel": "#en", "count": 10.0},
                    {"channel": "#fr", "count": 5.0}
                ]
            },
            {
                "timestamp": "2023-11-14T22:14:20.000Z",
                "result": [
                    {"channel": "#de", "count": 2.0}
                ]
            }
        ]);
        let table = normalize_response("topN", &raw, &QuerySettings::default(), "A").unwrap();
        assert_eq!(table.rows.len(), 3);
        // both inner rows of the first bucket share its timestamp
        assert_eq!(table.rows[0][0], table.rows[1][0]);
    }

    #[test]
    fn test_search_empty_result_list_is_empty_table() {
        let raw = json!([{"timestamp": "2023-11-14T22:13:20.000Z", "result": []}]);
        let table = normalize_response("search", &raw, &QuerySettings::default(), "A").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_scan_takes_columns_and_rows_verbatim() {
        let raw = json!([{
            "segmentId": "seg-0",
            "columns": ["__time", "value"],
            "events": [[1_700_000_000_000.0_f64, "5"], [1_700_000_060_000.0_f64, "6"]]
        }]);
        let table = normalize_response("scan", &raw, &QuerySettings::default(), "A").unwrap();
        assert_eq!(names(&table), vec!["__time", "value"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.columns[0].column_type, ColumnType::Time);
        assert_eq!(table.columns[1].column_type, ColumnType::Int);
    }

    #[test]
    fn test_segment_metadata_base_expands_intervals() {
        let raw = json!([{
            "id": "seg-0",
            "size": 1024.0,
            "intervals": [
                "2023-11-01T00:00:00.000Z/2023-11-02T00:00:00.000Z",
                "2023-11-02T00:00:00.000Z/2023-11-03T00:00:00.000Z"
            ],
            "aggregators": {},
            "columns": {},
            "timestampSpec": {}
        }]);
        let table =
            normalize_response("segmentMetadata", &raw, &settings_with_view("base"), "A").unwrap();
        let cols = names(&table);
        for expected in [
            "interval_start_0",
            "interval_stop_0",
            "interval_start_1",
            "interval_stop_1",
        ] {
            assert!(cols.contains(&expected), "missing {expected}");
        }
        assert!(!cols.contains(&"aggregators"));
        assert!(!cols.contains(&"timestampSpec"));

        let start_pos = cols.iter().position(|c| *c == "interval_start_0").unwrap();
        let stop_pos = cols.iter().position(|c| *c == "interval_stop_0").unwrap();
        assert_eq!(
            table.rows[0][start_pos],
            Cell::Str("2023-11-01T00:00:00.000Z".to_string())
        );
        assert_eq!(
            table.rows[0][stop_pos],
            Cell::Str("2023-11-02T00:00:00.000Z".to_string())
        );
    }

    #[test]
    fn test_segment_metadata_aggregators_view_pivots() {
        let raw = json!([{
            "intervals": [],
            "aggregators": {
                "count": {"type": "longSum", "fieldName": "count"},
                "added": {"type": "doubleSum", "fieldName": "added"}
            },
            "columns": {},
            "timestampSpec": {}
        }]);
        let table = normalize_response(
            "segmentMetadata",
            &raw,
            &settings_with_view("aggregators"),
            "A",
        )
        .unwrap();
        assert_eq!(names(&table)[0], "aggregator");
        assert_eq!(table.rows.len(), 2);
        let aggregator_names: Vec<&Cell> = table.rows.iter().map(|r| &r[0]).collect();
        assert!(aggregator_names.contains(&&Cell::Str("count".to_string())));
        assert!(aggregator_names.contains(&&Cell::Str("added".to_string())));
    }

    #[test]
    fn test_segment_metadata_columns_view_pivots() {
        let raw = json!([{
            "columns": {
                "__time": {"type": "LONG", "hasNulls": false},
                "channel": {"type": "STRING", "hasNulls": true}
            }
        }]);
        let table = normalize_response(
            "segmentMetadata",
            &raw,
            &settings_with_view("columns"),
            "A",
        )
        .unwrap();
        assert_eq!(names(&table)[0], "column");
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_segment_metadata_timestampspec_view() {
        let raw = json!([{
            "timestampSpec": {"column": "__time", "format": "millis"}
        }]);
        let table = normalize_response(
            "segmentMetadata",
            &raw,
            &settings_with_view("timestampspec"),
            "A",
        )
        .unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(names(&table).contains(&"column"));
        assert!(names(&table).contains(&"format"));
    }

    #[test]
    fn test_unknown_query_type_is_fatal() {
        let err = normalize_response("movingAverage", &json!([]), &QuerySettings::default(), "A")
            .unwrap_err();
        assert!(matches!(err, NormalizeError::UnknownQueryType(_)));
    }

    #[test]
    fn test_malformed_responses_yield_empty_tables() {
        for tag in [
            "sql",
            "timeseries",
            "topN",
            "search",
            "groupBy",
            "scan",
            "timeBoundary",
            "dataSourceMetadata",
            "segmentMetadata",
        ] {
            for raw in [json!(null), json!([]), json!("oops"), json!({"x": 1})] {
                let table =
                    normalize_response(tag, &raw, &QuerySettings::default(), "A").unwrap();
                assert!(table.is_empty(), "{tag} should be empty for {raw}");
            }
        }
    }

    #[test]
    fn test_row_lengths_match_columns() {
        let raw = json!([
            {"timestamp": "2023-11-14T22:13:20.000Z", "result": {"a": 1.0, "b": "x"}},
            {"timestamp": "2023-11-14T22:14:20.000Z", "result": {"a": 2.0}}
        ]);
        let table =
            normalize_response("timeseries", &raw, &QuerySettings::default(), "A").unwrap();
        for row in &table.rows {
            assert_eq!(row.len(), table.columns.len());
        }
    }
}
