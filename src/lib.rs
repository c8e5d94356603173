#![doc = include_str!("../README.md")]
// Declare modules
pub mod aggregations;
pub mod analyses;
pub mod context;
pub mod core;
pub mod error;
pub mod function;
pub mod registry;
pub mod telemetry;
pub mod transformations;
pub mod types;

/// Configuration options for the analytics core.
pub use crate::core::AnalyticsConfig;
/// Main entry point for resolving and evaluating functions.
pub use crate::core::{AnalyticsCore, FunctionRequest};
/// Shared per-query result store.
pub use crate::context::{FunctionContext, FunctionValue};
/// Error type for function resolution and execution.
pub use crate::error::FunctionError;
/// The function capability contract and its identity types.
pub use crate::function::{
    Aggregation, Analysis, Argument, Function, FunctionCategory, FunctionId, FunctionKind,
    TimeUnit, Transformation,
};
/// Name → function lookup table.
pub use crate::registry::FunctionRegistry;
/// Structured event hook for observability.
pub use crate::telemetry::{AnalyticsEvent, AnalyticsEventListener};
/// Time-series data model.
pub use crate::types::{GroupedSeries, JoinKey, TimeSeries, Timestamp, Value};
