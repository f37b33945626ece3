//! Compiles ad-hoc [`QueryRequest`]s against a [`Cube`] into one aggregate
//! query.
//!
//! Only catalog expressions and catalog names ever reach the SQL text. Filter
//! literals, time bounds and the limit are bound as parameters; order
//! directions are restricted to `ASC`/`DESC`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use classpulse_store::{QueryExecutor, Row, SqlValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cube::{BASE_RELATION, Cube, Dimension, TIME_COLUMN, ValueType};
use crate::error::{Error, Result};

/// An ad-hoc analytics request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub measures: Vec<String>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// Equality filters keyed by dimension name.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    /// Ignored unless positive.
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
}

impl QueryRequest {
    #[must_use]
    pub fn with_measure(mut self, name: impl Into<String>) -> Self {
        self.measures.push(name.into());
        self
    }

    #[must_use]
    pub fn with_dimension(mut self, name: impl Into<String>) -> Self {
        self.dimensions.push(name.into());
        self
    }

    #[must_use]
    pub fn with_filter(mut self, dimension: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(dimension.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.time_range = Some(TimeRange { start, end });
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_order(mut self, field: impl Into<String>, order: impl Into<String>) -> Self {
        self.order_by.push(OrderBy {
            field: field.into(),
            order: Some(order.into()),
        });
        self
    }
}

/// Inclusive bounds on the answer submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// A selected measure or dimension name.
    pub field: String,
    /// `ASC` or `DESC`, case-insensitive. Defaults to `ASC`.
    #[serde(default)]
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::Asc),
            Some(s) if s.eq_ignore_ascii_case("asc") => Ok(Self::Asc),
            Some(s) if s.eq_ignore_ascii_case("desc") => Ok(Self::Desc),
            Some(s) => Err(Error::InvalidOrderDirection(s.to_string())),
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
    /// Output column aliases, in projection order.
    pub columns: Vec<&'static str>,
}

/// Compile a request against `cube`.
///
/// Unknown measure, dimension, filter and order names are skipped. Fails
/// with [`Error::NoSelection`] when nothing selectable remains.
pub fn compile(cube: &Cube, request: &QueryRequest) -> Result<CompiledQuery> {
    let mut projection = Vec::new();
    let mut columns = Vec::new();
    let mut grouping = Vec::new();

    for measure in request.measures.iter().filter_map(|name| cube.measure(name)) {
        if columns.contains(&measure.name) {
            continue;
        }
        projection.push(format!("{} AS {}", measure.sql, measure.name));
        columns.push(measure.name);
    }
    for dimension in request
        .dimensions
        .iter()
        .filter_map(|name| cube.dimension(name))
    {
        if columns.contains(&dimension.name) {
            continue;
        }
        projection.push(format!("{} AS {}", dimension.sql, dimension.name));
        columns.push(dimension.name);
        grouping.push(dimension.sql);
    }

    if projection.is_empty() {
        return Err(Error::NoSelection);
    }

    let mut sql = format!("SELECT {} {}", projection.join(", "), BASE_RELATION);
    let mut params = Vec::new();
    let mut conditions = Vec::new();

    if let Some(range) = &request.time_range {
        conditions.push(format!("{TIME_COLUMN} BETWEEN ? AND ?"));
        params.push(SqlValue::Integer(range.start.timestamp_millis()));
        params.push(SqlValue::Integer(range.end.timestamp_millis()));
    }

    for (name, value) in &request.filters {
        let Some(dimension) = cube.dimension(name) else {
            debug!(dimension = %name, "ignoring filter on unknown dimension");
            continue;
        };
        conditions.push(format!("{} = ?", dimension.sql));
        params.push(bind_filter(dimension, value)?);
    }

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if !grouping.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&grouping.join(", "));
    }

    let mut ordering = Vec::new();
    for order in &request.order_by {
        let direction = Direction::parse(order.order.as_deref())?;
        match columns.iter().find(|c| **c == order.field) {
            Some(column) => ordering.push(format!("{column} {}", direction.as_sql())),
            None => debug!(field = %order.field, "ignoring order on unselected field"),
        }
    }
    if !ordering.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&ordering.join(", "));
    }

    if let Some(limit) = request.limit.filter(|l| *l > 0) {
        sql.push_str(" LIMIT ?");
        params.push(SqlValue::Integer(limit));
    }

    Ok(CompiledQuery {
        sql,
        params,
        columns,
    })
}

fn bind_filter(dimension: &Dimension, value: &str) -> Result<SqlValue> {
    let invalid = || Error::InvalidFilterValue {
        dimension: dimension.name.to_string(),
        value: value.to_string(),
    };
    let trimmed = value.trim();

    match dimension.value_type {
        ValueType::String => Ok(SqlValue::from(value)),
        ValueType::Number => trimmed
            .parse::<i64>()
            .map(SqlValue::Integer)
            .or_else(|_| trimmed.parse::<f64>().map(SqlValue::Real))
            .map_err(|_| invalid()),
        ValueType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(SqlValue::Integer(1)),
            "false" | "0" => Ok(SqlValue::Integer(0)),
            _ => Err(invalid()),
        },
        // Numeric date parts compare as integers, everything else as text.
        ValueType::Time => Ok(trimmed
            .parse::<i64>()
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::from(value))),
    }
}

/// Compiles requests against a cube and runs them on a [`QueryExecutor`].
#[derive(Clone)]
pub struct QueryCompiler {
    cube: &'static Cube,
    executor: Arc<dyn QueryExecutor>,
}

impl QueryCompiler {
    /// Compiler over the standard cube.
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self {
            cube: Cube::standard(),
            executor,
        }
    }

    #[must_use]
    pub fn with_cube(mut self, cube: &'static Cube) -> Self {
        self.cube = cube;
        self
    }

    pub fn cube(&self) -> &'static Cube {
        self.cube
    }

    pub fn compile(&self, request: &QueryRequest) -> Result<CompiledQuery> {
        compile(self.cube, request)
    }

    /// Compile and run a request, returning rows keyed by column alias.
    #[instrument(skip(self, request), level = "debug")]
    pub async fn execute(&self, request: &QueryRequest) -> Result<Vec<Row>> {
        let compiled = self.compile(request)?;
        debug!(sql = %compiled.sql, params = compiled.params.len(), "running compiled query");
        Ok(self.executor.execute(&compiled.sql, compiled.params).await?)
    }
}
