//! Analytics Engine Interface
//!
//! The external side of the bridge: the opaque compiled query and the HTTP
//! client that executes it. Everything past the raw JSON result belongs to
//! the normalize layer.

pub mod client;
pub mod query;

pub use client::{EngineClient, EngineConfig, EngineError};
pub use query::CompiledQuery;
