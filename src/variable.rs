//! Template Variable Values
//!
//! Flattens a normalized table into the `{value, text}` pairs dashboard
//! template variables consume, coercing per inferred column type.

use crate::normalize::table::{
    epoch_ms_to_time, parse_bool_loose, parse_engine_time, Cell, ColumnType, NormalizedTable,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

/// One selectable template-variable option.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFindValue {
    pub value: Value,
    pub text: String,
}

/// Flatten every cell of the table into variable options, column by
/// column. Nil cells of string, float, and int columns are skipped; bool
/// and time columns coerce them like the frame builder does.
pub fn metric_find_values(table: &NormalizedTable) -> Vec<MetricFindValue> {
    let mut values = Vec::new();
    for (pos, column) in table.columns.iter().enumerate() {
        for row in &table.rows {
            let Some(cell) = row.get(pos) else {
                continue;
            };
            if let Some(value) = convert_cell(column.column_type, cell) {
                values.push(value);
            }
        }
    }
    values
}

fn convert_cell(column_type: ColumnType, cell: &Cell) -> Option<MetricFindValue> {
    match column_type {
        ColumnType::String => match cell {
            Cell::Str(s) => Some(MetricFindValue {
                value: json!(s),
                text: s.clone(),
            }),
            _ => None,
        },
        ColumnType::Float => match cell {
            Cell::Num(n) => Some(MetricFindValue {
                value: json!(n),
                text: format!("{n:.6}"),
            }),
            _ => None,
        },
        ColumnType::Int => match cell {
            Cell::Str(s) => Some(MetricFindValue {
                value: json!(s.parse::<i64>().unwrap_or(0)),
                text: s.clone(),
            }),
            _ => None,
        },
        ColumnType::Bool => {
            let b = match cell {
                Cell::Bool(b) => *b,
                Cell::Str(s) => parse_bool_loose(s).unwrap_or(false),
                _ => false,
            };
            Some(MetricFindValue {
                value: json!(b as i64),
                text: b.to_string(),
            })
        }
        ColumnType::Time => {
            let t = match cell {
                Cell::Str(s) => parse_engine_time(s).unwrap_or_else(Utc::now),
                Cell::Num(n) => epoch_ms_to_time(*n),
                _ => epoch_ms_to_time(0.0),
            };
            Some(MetricFindValue {
                value: json!(t.timestamp()),
                text: t.format("%a %b %e %H:%M:%S UTC %Y").to_string(),
            })
        }
        ColumnType::Nil => None,
    }
}
