//! Result Normalization
//!
//! Reduces the engine's eight-plus per-query-type response shapes to one
//! uniform tabular form, with column types elected by statistical sampling
//! rather than schema.

pub mod adapters;
pub mod infer;
pub mod table;

pub use adapters::{adapter_for, normalize_response, NormalizeError, ShapeAdapter};
pub use infer::infer_column_type;
pub use table::{Cell, Column, ColumnType, NormalizedTable, ENGINE_TIME_FORMAT};
