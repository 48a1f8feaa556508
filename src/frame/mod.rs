//! Output Frames
//!
//! Typed columnar frame construction from normalized tables, plus the
//! long/wide/log layout re-projections consumed by the visualization
//! layer.

pub mod builder;
pub mod layout;
pub mod types;

pub use builder::build_frame;
pub use layout::{apply_layout, long_to_log, long_to_wide, LayoutError};
pub use types::{BuiltFrame, Field, FieldValues, Frame, FrameMeta, PreferredVisualization};
