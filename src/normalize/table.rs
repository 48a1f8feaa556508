//! Normalized Table Types
//!
//! The uniform tabular form every response shape is reduced to: ordered
//! columns, row-major cells, and the cell/column type vocabulary shared by
//! the type inferencer and the frame builder.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Textual timestamp format used by the analytics engine.
pub const ENGINE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A dynamically-typed scalar as decoded from engine JSON.
///
/// Cells arrive untyped; the semantic type of a column is assigned by
/// inference over its cells, never taken from engine metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Absent / JSON null
    Nil,
    /// JSON string (may carry an integer, boolean, or timestamp in text form)
    Str(String),
    /// JSON number
    Num(f64),
    /// JSON boolean
    Bool(bool),
}

impl Cell {
    /// True for cells the empty-column check treats as empty.
    pub fn is_empty_value(&self) -> bool {
        match self {
            Cell::Nil => true,
            Cell::Str(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Nil,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => Cell::Num(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => Cell::Str(s.clone()),
            // Nested structures are carried as their JSON text so a row
            // never loses a cell position.
            other => Cell::Str(other.to_string()),
        }
    }
}

/// Semantic type elected for a column by sampling its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Nil,
    String,
    Int,
    Float,
    Bool,
    Time,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Nil => "nil",
            ColumnType::String => "string",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Time => "time",
        }
    }
}

/// A named column with its inferred type.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Uniform tabular result for one sub-query.
///
/// Invariant: every row has exactly `columns.len()` cells, and when the
/// query type is time-bucketed the time-like column comes first.
#[derive(Debug, Clone, Default)]
pub struct NormalizedTable {
    /// Reference id of the originating sub-query
    pub reference: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
}

impl NormalizedTable {
    /// Create an empty table for the given sub-query reference.
    pub fn empty(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Parse a boolean in any of the engine's accepted textual forms.
///
/// Accepts the same token set as Go's `strconv.ParseBool`, which the engine
/// inherits for stringly-typed boolean dimensions.
pub fn parse_bool_loose(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Parse the engine's fixed textual timestamp format.
pub fn parse_engine_time(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, ENGINE_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Convert an epoch-millisecond float into an instant, splitting the value
/// into whole seconds plus a nanosecond remainder.
pub fn epoch_ms_to_time(ms: f64) -> DateTime<Utc> {
    let seconds = (ms / 1000.0).trunc();
    let fraction = ms / 1000.0 - seconds;
    DateTime::<Utc>::from_timestamp(seconds as i64, (fraction * 1e9) as u32)
        .unwrap_or_else(Utc::now)
}
