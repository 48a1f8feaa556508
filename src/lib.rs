//! # Tessera
//!
//! A bridge between dashboard front-ends and a column-oriented,
//! time-series-capable analytics engine. The engine answers each query type
//! with a structurally different JSON shape; Tessera rewrites query
//! templates before execution and normalizes every response shape into one
//! typed, columnar data frame for the visualization layer.
//!
//! ## Pipeline
//!
//! ```text
//! raw query JSON → interpolate → context/settings merge → [engine call]
//!     → shape adapter → normalized table → type inference
//!     → frame builder → layout transform → output frame
//! ```
//!
//! ## Modules
//!
//! - [`interpolate`]: time-range/interval macro substitution
//! - [`context`]: execution-context parameter merging
//! - [`settings`]: per-query settings bag with instance defaults
//! - [`engine`]: opaque compiled query + HTTP execution client
//! - [`normalize`]: per-query-type response shape adapters and column
//!   type inference
//! - [`frame`]: typed frame construction and long/wide/log layouts
//! - [`datasource`]: per-request orchestration with sub-query isolation
//! - [`variable`]: template-variable value extraction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tessera::{Config, DataQuery, Datasource, QueryDataRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let datasource = Datasource::from_config(&config)?;
//!
//!     let request = QueryDataRequest {
//!         queries: vec![DataQuery {
//!             ref_id: "A".to_string(),
//!             json: r#"{
//!                 "builder": {"queryType": "timeseries", "granularity": "$__interval"},
//!                 "settings": {"format": "long"}
//!             }"#
//!             .to_string(),
//!             interval: Duration::from_secs(60),
//!             range: Duration::from_secs(6 * 3600),
//!         }],
//!     };
//!
//!     let response = datasource.query_data(&request).await;
//!     let result = &response.responses["A"];
//!     println!("{} frame(s)", result.frames.len());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod datasource;
pub mod engine;
pub mod frame;
pub mod interpolate;
pub mod normalize;
pub mod settings;
pub mod variable;

// Re-export top-level types for convenience
pub use config::{Config, ConfigError, ConnectionConfig, LoggingConfig};

pub use context::{layer_from_values, merge_layers, ContextParameter};

pub use datasource::{
    DataQuery, DataResponse, Datasource, DatasourceError, QueryDataRequest, QueryDataResponse,
};

pub use engine::{CompiledQuery, EngineClient, EngineConfig, EngineError};

pub use frame::{
    apply_layout, build_frame, BuiltFrame, Field, FieldValues, Frame, FrameMeta, LayoutError,
    PreferredVisualization,
};

pub use interpolate::interpolate_variables;

pub use normalize::{
    adapter_for, infer_column_type, normalize_response, Cell, Column, ColumnType, NormalizeError,
    NormalizedTable, ShapeAdapter,
};

pub use settings::QuerySettings;

pub use variable::{metric_find_values, MetricFindValue};
