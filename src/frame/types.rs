//! Output Frame Types
//!
//! The typed, columnar form handed to the presentation boundary: named
//! fields of homogeneous arrays plus optional frame-level metadata.

use chrono::{DateTime, Utc};

/// Homogeneously-typed values of one output field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Strings(Vec<String>),
    Floats(Vec<f64>),
    Ints(Vec<i64>),
    Bools(Vec<bool>),
    Times(Vec<DateTime<Utc>>),
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Strings(v) => v.len(),
            FieldValues::Floats(v) => v.len(),
            FieldValues::Ints(v) => v.len(),
            FieldValues::Bools(v) => v.len(),
            FieldValues::Times(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// An empty array of the same variant.
    pub fn new_like(&self) -> FieldValues {
        match self {
            FieldValues::Strings(_) => FieldValues::Strings(Vec::new()),
            FieldValues::Floats(_) => FieldValues::Floats(Vec::new()),
            FieldValues::Ints(_) => FieldValues::Ints(Vec::new()),
            FieldValues::Bools(_) => FieldValues::Bools(Vec::new()),
            FieldValues::Times(_) => FieldValues::Times(Vec::new()),
        }
    }

    /// An array of the same variant holding `len` default values.
    pub fn defaults_like(&self, len: usize) -> FieldValues {
        match self {
            FieldValues::Strings(_) => FieldValues::Strings(vec![String::new(); len]),
            FieldValues::Floats(_) => FieldValues::Floats(vec![0.0; len]),
            FieldValues::Ints(_) => FieldValues::Ints(vec![0; len]),
            FieldValues::Bools(_) => FieldValues::Bools(vec![false; len]),
            FieldValues::Times(_) => FieldValues::Times(vec![
                DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_else(Utc::now);
                len
            ]),
        }
    }

    /// Copy the value at `from` into position `to` of `dst`. A no-op when
    /// the variants differ or an index is out of range.
    pub fn copy_into(&self, from: usize, dst: &mut FieldValues, to: usize) {
        match (self, dst) {
            (FieldValues::Strings(src), FieldValues::Strings(d)) => {
                if let (Some(v), Some(slot)) = (src.get(from), d.get_mut(to)) {
                    *slot = v.clone();
                }
            }
            (FieldValues::Floats(src), FieldValues::Floats(d)) => {
                if let (Some(v), Some(slot)) = (src.get(from), d.get_mut(to)) {
                    *slot = *v;
                }
            }
            (FieldValues::Ints(src), FieldValues::Ints(d)) => {
                if let (Some(v), Some(slot)) = (src.get(from), d.get_mut(to)) {
                    *slot = *v;
                }
            }
            (FieldValues::Bools(src), FieldValues::Bools(d)) => {
                if let (Some(v), Some(slot)) = (src.get(from), d.get_mut(to)) {
                    *slot = *v;
                }
            }
            (FieldValues::Times(src), FieldValues::Times(d)) => {
                if let (Some(v), Some(slot)) = (src.get(from), d.get_mut(to)) {
                    *slot = *v;
                }
            }
            _ => {}
        }
    }

    /// Textual rendering of one value, used for pivot labels.
    pub fn display_at(&self, index: usize) -> String {
        match self {
            FieldValues::Strings(v) => v.get(index).cloned().unwrap_or_default(),
            FieldValues::Floats(v) => v.get(index).map(f64::to_string).unwrap_or_default(),
            FieldValues::Ints(v) => v.get(index).map(i64::to_string).unwrap_or_default(),
            FieldValues::Bools(v) => v.get(index).map(bool::to_string).unwrap_or_default(),
            FieldValues::Times(v) => v
                .get(index)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

/// A named, typed output column.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub values: FieldValues,
}

impl Field {
    pub fn new(name: impl Into<String>, values: FieldValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Visualization hint for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredVisualization {
    Logs,
}

/// Frame-level metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameMeta {
    pub preferred_visualization: Option<PreferredVisualization>,
}

/// Columnar output table for one sub-query.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Frame name; the originating sub-query reference for long frames
    pub name: String,
    pub fields: Vec<Field>,
    pub meta: Option<FrameMeta>,
}

impl Frame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            meta: None,
        }
    }

    /// Number of rows; 0 for a frame with no fields.
    pub fn row_count(&self) -> usize {
        self.fields.first().map(|f| f.values.len()).unwrap_or(0)
    }
}

/// A built frame plus an optional non-fatal advisory (e.g. row limit hit).
#[derive(Debug, Clone)]
pub struct BuiltFrame {
    pub frame: Frame,
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_like_lengths_and_values() {
        let floats = FieldValues::Floats(vec![1.0]);
        match floats.defaults_like(3) {
            FieldValues::Floats(v) => assert_eq!(v, vec![0.0, 0.0, 0.0]),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_copy_into_matching_variants() {
        let src = FieldValues::Ints(vec![7, 8, 9]);
        let mut dst = src.defaults_like(2);
        src.copy_into(1, &mut dst, 0);
        assert_eq!(dst, FieldValues::Ints(vec![8, 0]));
    }

    #[test]
    fn test_copy_into_mismatch_is_noop() {
        let src = FieldValues::Ints(vec![7]);
        let mut dst = FieldValues::Strings(vec![String::new()]);
        src.copy_into(0, &mut dst, 0);
        assert_eq!(dst, FieldValues::Strings(vec![String::new()]));
    }

    #[test]
    fn test_row_count() {
        let mut frame = Frame::new("A");
        assert_eq!(frame.row_count(), 0);
        frame
            .fields
            .push(Field::new("x", FieldValues::Floats(vec![1.0, 2.0])));
        assert_eq!(frame.row_count(), 2);
    }
}
