//! SQLite connector (`sqlite://<path>?table=<name>`).
//!
//! rusqlite is synchronous, so every statement runs under
//! `spawn_blocking` against a shared `Mutex<Connection>`.

use async_trait::async_trait;
use contracts_core::{Dialect, IoStats};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info};

use super::{
    check_columns, io_stats, rows_to_table, Connector, DatasetAddress, Materializer, SqlEndpoint,
};
use crate::sql::{dialect_for, SqlDialect};
use crate::{DataValue, SourceError, Table};

/// Connector for `sqlite://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

#[async_trait]
impl Connector for SqliteConnector {
    fn schemes(&self) -> Vec<String> {
        vec!["sqlite".to_string()]
    }

    async fn open(&self, address: &DatasetAddress) -> Result<Box<dyn Materializer>, SourceError> {
        let table = address.required_param("table")?;
        let source = SqliteSource::open(address.location(), table).await?;
        Ok(Box::new(source))
    }
}

/// One table of a SQLite database file, opened read-only.
pub struct SqliteSource {
    address: String,
    table: String,
    conn: Arc<Mutex<Connection>>,
    last_io: Mutex<Option<IoStats>>,
}

impl SqliteSource {
    /// Opens `table` in the database at `path`.
    pub async fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let table = table.into();
        if !path.is_file() {
            return Err(SourceError::NotFound(path.display().to_string()));
        }

        let open_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || {
            Connection::open_with_flags(
                &open_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
        })
        .await
        .map_err(|e| SourceError::Connection(e.to_string()))?
        .map_err(|e| SourceError::Connection(e.to_string()))?;

        let source = Self {
            address: format!("sqlite://{}?table={}", path.display(), table),
            table,
            conn: Arc::new(Mutex::new(conn)),
            last_io: Mutex::new(None),
        };
        if source.columns().await?.is_empty() {
            return Err(SourceError::NotFound(format!(
                "table '{}' in {}",
                source.table,
                path.display()
            )));
        }
        info!("Opened SQLite table '{}' in {}", source.table, path.display());
        Ok(source)
    }

    fn dialect_impl(&self) -> &'static dyn SqlDialect {
        dialect_for(Dialect::Sqlite)
    }

    fn quoted_table(&self) -> String {
        self.dialect_impl().quote_identifier(&self.table)
    }

    /// Column names and declared types, in table order.
    async fn columns(&self) -> Result<Vec<(String, String)>, SourceError> {
        let sql = format!("PRAGMA table_info({})", self.quoted_table());
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?;
            rows.collect::<Result<Vec<_>, _>>().map_err(SourceError::from)
        })
        .await
        .map_err(|e| SourceError::Query(e.to_string()))?
    }

    async fn run(&self, sql: String) -> Result<Vec<Vec<DataValue>>, SourceError> {
        debug!("SQLite query: {}", sql);
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            let mut stmt = conn.prepare(&sql)?;
            let width = stmt.column_count();
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    values.push(sqlite_value(row.get_ref(i)?));
                }
                out.push(values);
            }
            Ok::<_, SourceError>(out)
        })
        .await
        .map_err(|e| SourceError::Query(e.to_string()))?
    }
}

/// Maps a SQLite value to a [`DataValue`]; blobs are read as lossy UTF-8.
fn sqlite_value(value: ValueRef<'_>) -> DataValue {
    match value {
        ValueRef::Null => DataValue::Null,
        ValueRef::Integer(i) => DataValue::Int(i),
        ValueRef::Real(f) => DataValue::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            DataValue::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Applies the column's declared type affinity so a column never mixes
/// strings and numbers.
fn coerce(declared: &str, value: DataValue) -> DataValue {
    let declared = declared.to_ascii_uppercase();
    let text = declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT");
    match value {
        DataValue::Int(i) if declared.contains("BOOL") => DataValue::Bool(i != 0),
        DataValue::Int(_) | DataValue::Float(_) if text => DataValue::String(value.to_string()),
        other => other,
    }
}

#[async_trait]
impl Materializer for SqliteSource {
    fn address(&self) -> &str {
        &self.address
    }

    async fn schema(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.columns().await?.into_iter().map(|(name, _)| name).collect())
    }

    async fn materialize(&self, columns: &[String]) -> Result<Table, SourceError> {
        let started = Instant::now();
        let declared = self.columns().await?;
        let available: Vec<String> = declared.iter().map(|(n, _)| n.clone()).collect();
        check_columns(&available, columns)?;

        let table = if columns.is_empty() {
            let rows = self
                .run(format!("SELECT COUNT(*) FROM {}", self.quoted_table()))
                .await?;
            let count = rows
                .first()
                .and_then(|r| r.first())
                .and_then(DataValue::as_int)
                .unwrap_or(0);
            Table::with_row_count(count as usize)?
        } else {
            let dialect = self.dialect_impl();
            let select = columns
                .iter()
                .map(|c| dialect.quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ");
            let rows = self
                .run(format!("SELECT {} FROM {}", select, self.quoted_table()))
                .await?;
            let types: Vec<&str> = columns
                .iter()
                .map(|c| {
                    declared
                        .iter()
                        .find(|(n, _)| n == c)
                        .map(|(_, t)| t.as_str())
                        .unwrap_or("")
                })
                .collect();
            let rows = rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .zip(&types)
                        .map(|(value, declared)| coerce(declared, value))
                        .collect()
                })
                .collect();
            rows_to_table(columns, rows)?
        };

        let stats = io_stats(&table, columns, started);
        debug!("Materialized {} rows from {}", stats.rows, self.address);
        *self.last_io.lock().unwrap_or_else(|e| e.into_inner()) = Some(stats);
        Ok(table)
    }

    fn io_debug(&self) -> Option<IoStats> {
        self.last_io.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn sql(&self) -> Option<&dyn SqlEndpoint> {
        Some(self)
    }
}

#[async_trait]
impl SqlEndpoint for SqliteSource {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn relation(&self) -> &str {
        &self.table
    }

    async fn query(&self, sql: &str) -> Result<Vec<Vec<DataValue>>, SourceError> {
        self.run(sql.to_string()).await
    }
}
