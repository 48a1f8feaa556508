//! Frame Builder
//!
//! Turns a [`NormalizedTable`] into a typed columnar [`Frame`]: applies the
//! row limit (non-fatal, advisory), selects one typed column builder per
//! inferred type, coerces every cell with defined defaults, and drops
//! never-populated columns when asked to.

use crate::frame::types::{BuiltFrame, Field, FieldValues, Frame};
use crate::normalize::table::{
    epoch_ms_to_time, parse_bool_loose, parse_engine_time, Cell, ColumnType, NormalizedTable,
};
use crate::settings::QuerySettings;
use chrono::Utc;

/// Build the output frame for one normalized table.
///
/// The result is always populated; a hit row limit surfaces as a warning
/// next to the truncated frame, never as a failure.
pub fn build_frame(table: &NormalizedTable, settings: &QuerySettings) -> BuiltFrame {
    let mut warning = None;

    let limit = settings.response_limit();
    let rows: &[Vec<Cell>] = if limit > 0 && table.rows.len() > limit {
        warning = Some(format!(
            "query response limit exceeded (> {limit} rows): \
             consider adding filters and/or reducing the query time range"
        ));
        &table.rows[..limit]
    } else {
        &table.rows
    };

    const NIL: Cell = Cell::Nil;

    let mut frame = Frame::new(table.reference.clone());
    for (pos, column) in table.columns.iter().enumerate() {
        let mut values = new_builder(column.column_type);
        let mut column_is_empty = true;

        for row in rows {
            let cell = row.get(pos).unwrap_or(&NIL);
            if column_is_empty && !cell.is_empty_value() {
                column_is_empty = false;
            }
            append_coerced(&mut values, column.column_type, cell);
        }

        if settings.hide_empty_columns() && column_is_empty {
            continue;
        }
        frame.fields.push(Field::new(column.name.clone(), values));
    }

    BuiltFrame { frame, warning }
}

/// Allocate the typed array matching an inferred column type. Nil columns
/// materialize as string arrays of the literal "nil".
fn new_builder(column_type: ColumnType) -> FieldValues {
    match column_type {
        ColumnType::String | ColumnType::Nil => FieldValues::Strings(Vec::new()),
        ColumnType::Float => FieldValues::Floats(Vec::new()),
        ColumnType::Int => FieldValues::Ints(Vec::new()),
        ColumnType::Bool => FieldValues::Bools(Vec::new()),
        ColumnType::Time => FieldValues::Times(Vec::new()),
    }
}

/// Coerce one cell into the column's typed array. Per-cell failures never
/// propagate: every type has a defined fallback value.
fn append_coerced(values: &mut FieldValues, column_type: ColumnType, cell: &Cell) {
    match (column_type, values) {
        (ColumnType::Nil, FieldValues::Strings(out)) => out.push("nil".to_string()),
        (ColumnType::String, FieldValues::Strings(out)) => out.push(match cell {
            Cell::Nil => String::new(),
            Cell::Str(s) => s.clone(),
            Cell::Num(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }),
        (ColumnType::Float, FieldValues::Floats(out)) => out.push(match cell {
            Cell::Nil => 0.0,
            Cell::Num(n) => *n,
            Cell::Str(s) => s.parse().unwrap_or(0.0),
            Cell::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }),
        (ColumnType::Int, FieldValues::Ints(out)) => out.push(match cell {
            Cell::Nil => 0,
            Cell::Str(s) => s.parse().unwrap_or(0),
            Cell::Num(n) => *n as i64,
            Cell::Bool(b) => *b as i64,
        }),
        (ColumnType::Bool, FieldValues::Bools(out)) => out.push(match cell {
            Cell::Bool(b) => *b,
            Cell::Str(s) => parse_bool_loose(s).unwrap_or(false),
            Cell::Num(n) => *n != 0.0,
            Cell::Nil => false,
        }),
        (ColumnType::Time, FieldValues::Times(out)) => out.push(match cell {
            Cell::Nil => epoch_ms_to_time(0.0),
            Cell::Num(n) => epoch_ms_to_time(*n),
            Cell::Str(s) => parse_engine_time(s).unwrap_or_else(Utc::now),
            Cell::Bool(_) => epoch_ms_to_time(0.0),
        }),
        // builder allocation always matches the column type
        _ => {}
    }
}
