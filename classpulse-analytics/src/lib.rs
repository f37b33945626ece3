//! Analytics for classpulse.
//!
//! Two ways to read quiz telemetry:
//!
//! - **Ad-hoc**: a [`QueryRequest`] names measures and dimensions from the
//!   [`Cube`]; [`QueryCompiler`] turns it into one parameterized aggregate
//!   query and returns the raw rows.
//! - **Reports**: [`ReportAggregator`] computes a fixed set of derived metrics
//!   (response rate, latency, completion, dropoff, rankings and more), each
//!   annotated with a qualitative analysis.

pub mod compiler;
pub mod cube;
pub mod error;
pub mod reports;

pub use compiler::{CompiledQuery, OrderBy, QueryCompiler, QueryRequest, TimeRange, compile};
pub use cube::{
    Cube, CubeDescription, Dimension, DisplayFormat, FieldDescription, Measure, MeasureKind,
    ValueType,
};
pub use error::{Error, Result};
pub use reports::ReportAggregator;
