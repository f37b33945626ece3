//! Turso/libSQL implementation of the storage traits.
//!
//! It can connect to:
//! - Remote Turso database (cloud)
//! - Local embedded SQLite file
//! - In-memory database (tests)

mod events;
mod query;
mod reports;
mod roster;
mod schema;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database};
use tracing::debug;

use crate::error::{Error, Result};

/// libSQL-backed store implementing every storage trait.
///
/// Cloning is cheap; clones share the database handle and connection.
#[derive(Clone)]
pub struct TursoStore {
    _db: Arc<Database>,
    conn: Connection,
}

impl TursoStore {
    /// Open (or create) an embedded database file.
    pub async fn new_local(path: &Path) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        Self::from_database(db).await
    }

    /// Connect to a remote Turso database.
    pub async fn new_remote(url: &str, token: &str) -> Result<Self> {
        let db = Builder::new_remote(url.to_string(), token.to_string())
            .build()
            .await?;
        Self::from_database(db).await
    }

    /// Create an in-memory database (for testing).
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        // One shared connection; an in-memory database lives only as long
        // as the connection that created it.
        let conn = db.connect()?;
        let store = Self {
            _db: Arc::new(db),
            conn,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Ensure every table and index exists.
    async fn ensure_schema(&self) -> Result<()> {
        for statement in schema::TABLES.iter().chain(schema::INDEXES) {
            self.conn.execute(statement, ()).await?;
        }
        debug!("Schema ready");
        Ok(())
    }
}

/// Format a timestamp for storage.
fn to_millis(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

/// Parse a timestamp from storage.
fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(Error::TimestampOutOfRange(ms))
}

/// Parse an identifier column.
fn parse_id<T: FromStr>(raw: &str, column: &str) -> Result<T> {
    raw.parse().map_err(|_| Error::InvalidId {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

/// Read a non-negative count column.
fn count(row: &libsql::Row, idx: i32) -> Result<u64> {
    let value: Option<i64> = row.get(idx)?;
    Ok(value.unwrap_or(0).max(0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let store = TursoStore::new_memory().await.unwrap();
        store.ensure_schema().await.unwrap();
    }

    #[tokio::test]
    async fn local_file_database_persists_between_opens() {
        use crate::ids::ClassroomId;
        use crate::records::Classroom;
        use crate::traits::RosterStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classpulse.db");
        let classroom_id = ClassroomId::new();

        {
            let store = TursoStore::new_local(&path).await.unwrap();
            store
                .create_classroom(&Classroom {
                    classroom_id,
                    name: "7B".to_string(),
                })
                .await
                .unwrap();
        }

        let reopened = TursoStore::new_local(&path).await.unwrap();
        let students = reopened.classroom_students(classroom_id).await.unwrap();
        assert!(students.is_empty());
        let mut rows = reopened
            .conn()
            .query(
                "SELECT name FROM classrooms WHERE classroom_id = ?1",
                [classroom_id.to_string()],
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let name: String = row.get(0).unwrap();
        assert_eq!(name, "7B");
    }

    #[test]
    fn millis_round_trip_keeps_precision() {
        let now = DateTime::from_timestamp_millis(1_740_000_000_123).unwrap();
        assert_eq!(from_millis(to_millis(now)).unwrap(), now);
    }
}
