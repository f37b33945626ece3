//! Bind parameters and result rows for ad-hoc queries.

use serde::{Deserialize, Serialize};

/// A result row keyed by column alias.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A literal bound to a `?` placeholder. Callers never splice values into SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<SqlValue> for libsql::Value {
    fn from(v: SqlValue) -> Self {
        match v {
            SqlValue::Null => libsql::Value::Null,
            SqlValue::Integer(i) => libsql::Value::Integer(i),
            SqlValue::Real(r) => libsql::Value::Real(r),
            SqlValue::Text(t) => libsql::Value::Text(t),
        }
    }
}

/// Convert a column value into JSON for a result [`Row`].
pub(crate) fn to_json(value: libsql::Value) -> serde_json::Value {
    match value {
        libsql::Value::Null => serde_json::Value::Null,
        libsql::Value::Integer(i) => serde_json::Value::from(i),
        libsql::Value::Real(r) => serde_json::Number::from_f64(r)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        libsql::Value::Text(t) => serde_json::Value::String(t),
        libsql::Value::Blob(b) => serde_json::Value::from(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_pick_matching_variant() {
        assert_eq!(SqlValue::from(3_i64), SqlValue::Integer(3));
        assert_eq!(SqlValue::from(true), SqlValue::Integer(1));
        assert_eq!(SqlValue::from("A"), SqlValue::Text("A".to_string()));
    }

    #[test]
    fn non_finite_reals_become_null() {
        assert_eq!(to_json(libsql::Value::Real(f64::NAN)), serde_json::Value::Null);
        assert_eq!(to_json(libsql::Value::Real(2.5)), serde_json::json!(2.5));
    }
}
