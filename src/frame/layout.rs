//! Layout Transformation
//!
//! Re-projects a long (row-per-record) frame into the "wide" or "log"
//! layouts. The long frame is the default and passes through unchanged.
//! A failed wide pivot silently retains the long frame.

use crate::frame::types::{Field, FieldValues, Frame, FrameMeta, PreferredVisualization};
use crate::settings::QuerySettings;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from the wide pivot; callers retain the long frame on any of
/// these.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("long frame has no time field to pivot on")]
    NoTimeField,

    #[error("long frame has no value fields to pivot")]
    NoValueFields,
}

/// Apply the layout selected by the `format` setting. "wide" and "log" act
/// only on a non-empty field set.
pub fn apply_layout(frame: Frame, settings: &QuerySettings) -> Frame {
    match settings.format() {
        "wide" if !frame.fields.is_empty() => match long_to_wide(&frame) {
            Ok(wide) => wide,
            Err(_) => frame,
        },
        "log" if !frame.fields.is_empty() => long_to_log(frame, settings),
        _ => frame,
    }
}

/// Pivot a long frame to wide: rows group on the first time field, and
/// every value field fans out into one column per combination of the
/// string fields' values.
pub fn long_to_wide(frame: &Frame) -> Result<Frame, LayoutError> {
    let time_idx = frame
        .fields
        .iter()
        .position(|f| matches!(f.values, FieldValues::Times(_)))
        .ok_or(LayoutError::NoTimeField)?;

    let mut label_idxs = Vec::new();
    let mut value_idxs = Vec::new();
    for (idx, field) in frame.fields.iter().enumerate() {
        if idx == time_idx {
            continue;
        }
        match field.values {
            FieldValues::Strings(_) => label_idxs.push(idx),
            _ => value_idxs.push(idx),
        }
    }
    if value_idxs.is_empty() {
        return Err(LayoutError::NoValueFields);
    }

    let FieldValues::Times(times) = &frame.fields[time_idx].values else {
        return Err(LayoutError::NoTimeField);
    };

    // Output rows: unique timestamps in order of first appearance.
    let mut out_times = Vec::new();
    let mut time_slot: HashMap<i64, usize> = HashMap::new();
    for t in times {
        time_slot.entry(t.timestamp_nanos_opt().unwrap_or(0)).or_insert_with(|| {
            out_times.push(*t);
            out_times.len() - 1
        });
    }

    // One output column per (value field, label combination), labels in
    // order of first appearance.
    let mut wide = Frame::new(frame.name.clone());
    wide.fields.push(Field::new(
        frame.fields[time_idx].name.clone(),
        FieldValues::Times(out_times.clone()),
    ));

    for &value_idx in &value_idxs {
        let value_field = &frame.fields[value_idx];
        let mut combos: Vec<(String, FieldValues)> = Vec::new();
        let mut combo_slot: HashMap<String, usize> = HashMap::new();

        for row in 0..times.len() {
            let label = label_idxs
                .iter()
                .map(|&li| {
                    format!(
                        "{}={}",
                        frame.fields[li].name,
                        frame.fields[li].values.display_at(row)
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");
            let slot = *combo_slot.entry(label.clone()).or_insert_with(|| {
                let name = if label.is_empty() {
                    value_field.name.clone()
                } else {
                    format!("{} {{{label}}}", value_field.name)
                };
                combos.push((name, value_field.values.defaults_like(out_times.len())));
                combos.len() - 1
            });

            let out_row = time_slot
                .get(&times[row].timestamp_nanos_opt().unwrap_or(0))
                .copied()
                .unwrap_or(0);
            let (_, values) = &mut combos[slot];
            value_field.values.copy_into(row, values, out_row);
        }

        for (name, values) in combos {
            wide.fields.push(Field::new(name, values));
        }
    }

    Ok(wide)
}

/// Reorder fields for the log viewer: the configured time and message
/// fields come first because the log UI takes the first match of each as
/// canonical. The time field is skipped in its original position; the
/// message field is intentionally kept in both places so it still shows up
/// as a detected field under its original name. The level field is renamed
/// to the literal "level" when its source name differs.
pub fn long_to_log(long: Frame, settings: &QuerySettings) -> Frame {
    let time_name = settings.log_column_time();
    let level_name = settings.log_column_level();
    let message_name = settings.log_column_message();

    let mut log = Frame::new("response");
    log.meta = Some(FrameMeta {
        preferred_visualization: Some(PreferredVisualization::Logs),
    });

    for field in &long.fields {
        if field.name == time_name || field.name == message_name {
            log.fields.push(field.clone());
        }
    }
    for field in long.fields {
        if field.name == time_name {
            continue;
        }
        let mut field = field;
        if field.name == level_name {
            field.name = "level".to_string();
        }
        log.fields.push(field);
    }

    log
}
