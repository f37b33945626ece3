//! [`QueryExecutor`] on libSQL.

use async_trait::async_trait;
use libsql::params::Params;
use tracing::{debug, instrument};

use super::TursoStore;
use crate::error::Result;
use crate::traits::QueryExecutor;
use crate::value::{Row, SqlValue, to_json};

#[async_trait]
impl QueryExecutor for TursoStore {
    #[instrument(skip(self, sql, params), fields(params = params.len()), level = "debug")]
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
        let params = Params::Positional(params.into_iter().map(libsql::Value::from).collect());
        let mut rows = self.conn().query(sql, params).await?;

        let columns: Vec<String> = (0..rows.column_count())
            .map(|i| rows.column_name(i).unwrap_or_default().to_string())
            .collect();

        let mut result = Vec::new();
        while let Some(row) = rows.next().await? {
            let mut record = Row::new();
            for (idx, column) in columns.iter().enumerate() {
                let value = row.get_value(idx as i32)?;
                record.insert(column.clone(), to_json(value));
            }
            result.push(record);
        }

        debug!(rows = result.len(), "query executed");
        Ok(result)
    }
}
