//! Column Type Inference
//!
//! Elects a semantic type for each column by sampling a bounded subset of
//! its cells and voting. The engine supplies no per-column types for most
//! query shapes, so typing is statistical by design.
//!
//! The election rule is deliberately crude and contractual: downstream
//! coercion depends on it, so it must not be "improved". See the module
//! tests for the exact behavior.

use crate::normalize::table::{parse_bool_loose, parse_engine_time, Cell, ColumnType};

/// Maximum number of cells sampled per column.
const MAX_SAMPLES: usize = 5;

/// Infer the type of the column at `pos` from the full row set.
///
/// Rows are sampled at a fixed stride so at most [`MAX_SAMPLES`] cells are
/// examined regardless of row count.
pub fn infer_column_type(name: &str, pos: usize, rows: &[Vec<Cell>]) -> ColumnType {
    // Votes keep insertion order; the nil baseline is always seeded first.
    let mut votes: Vec<(ColumnType, usize)> = vec![(ColumnType::Nil, 0)];

    let stride = usize::max(1, rows.len().div_ceil(MAX_SAMPLES));
    let mut i = 0;
    while i < rows.len() {
        if let Some(cell) = rows[i].get(pos) {
            if let Some(vote) = classify_cell(name, cell) {
                cast_vote(&mut votes, vote);
            }
        }
        i += stride;
    }

    elect(votes)
}

/// Classify a single sampled cell; nil cells cast no vote.
fn classify_cell(column_name: &str, cell: &Cell) -> Option<ColumnType> {
    match cell {
        Cell::Nil => None,
        Cell::Str(s) => {
            if s.parse::<i64>().is_ok() {
                Some(ColumnType::Int)
            } else if parse_bool_loose(s).is_some() {
                Some(ColumnType::Bool)
            } else if parse_engine_time(s).is_some() {
                Some(ColumnType::Time)
            } else {
                Some(ColumnType::String)
            }
        }
        Cell::Num(_) => {
            if column_name == "__time" || column_name.to_lowercase().contains("time_") {
                Some(ColumnType::Time)
            } else {
                Some(ColumnType::Float)
            }
        }
        Cell::Bool(_) => Some(ColumnType::Bool),
    }
}

fn cast_vote(votes: &mut Vec<(ColumnType, usize)>, vote: ColumnType) {
    if let Some(entry) = votes.iter_mut().find(|(t, _)| *t == vote) {
        entry.1 += 1;
    } else {
        votes.push((vote, 1));
    }
}

/// Elect the winning type from the vote distribution.
///
/// With exactly two categories (the seeded nil baseline plus one voted
/// type) the leading entry wins; any other distribution falls back to
/// string. Mixed columns therefore always elect string.
fn elect(mut votes: Vec<(ColumnType, usize)>) -> ColumnType {
    votes.sort_by(|a, b| b.1.cmp(&a.1));
    if votes.len() == 2 {
        votes[0].0
    } else {
        ColumnType::String
    }
}
