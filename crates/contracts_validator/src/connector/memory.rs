//! In-memory source, queryable through DataFusion SQL.

use async_trait::async_trait;
use contracts_core::{Dialect, IoStats};
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

use super::{check_columns, io_stats, Materializer, SqlEndpoint};
use crate::dataset::column_values;
use crate::{DataValue, SourceError, Table};

const RELATION: &str = "dataset";

/// A table held in memory.
///
/// Registered as the relation `dataset` in a private DataFusion session, so
/// it is SQL-backed with the `datafusion` dialect.
///
/// # Example
///
/// ```rust
/// use contracts_validator::{DataValue, InMemorySource, Materializer, Table};
///
/// let table = Table::from_columns(vec![("id", vec![DataValue::Int(1), DataValue::Int(2)])]).unwrap();
/// let source = InMemorySource::new(table).unwrap();
/// assert!(source.sql().is_some());
/// ```
pub struct InMemorySource {
    table: Table,
    ctx: SessionContext,
    last_io: Mutex<Option<IoStats>>,
}

impl InMemorySource {
    /// Wraps a table.
    pub fn new(table: Table) -> Result<Self, SourceError> {
        let batch = table.record_batch().clone();
        let mem_table = MemTable::try_new(batch.schema(), vec![vec![batch]])?;
        let ctx = SessionContext::new();
        ctx.register_table(RELATION, Arc::new(mem_table))?;
        Ok(Self {
            table,
            ctx,
            last_io: Mutex::new(None),
        })
    }

    /// The wrapped table.
    pub fn table(&self) -> &Table {
        &self.table
    }
}

#[async_trait]
impl Materializer for InMemorySource {
    fn address(&self) -> &str {
        "memory://dataset"
    }

    async fn schema(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.table.column_names())
    }

    async fn materialize(&self, columns: &[String]) -> Result<Table, SourceError> {
        let started = Instant::now();
        check_columns(&self.table.column_names(), columns)?;
        let table = self.table.project(columns)?;
        *self.last_io.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(io_stats(&table, columns, started));
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
impl SqlEndpoint for InMemorySource {
    fn dialect(&self) -> Dialect {
        Dialect::Datafusion
    }

    fn relation(&self) -> &str {
        RELATION
    }

    async fn query(&self, sql: &str) -> Result<Vec<Vec<DataValue>>, SourceError> {
        debug!("DataFusion query: {}", sql);
        let batches = self.ctx.sql(sql).await?.collect().await?;

        let mut rows = Vec::new();
        for batch in &batches {
            let schema = batch.schema();
            let columns = schema
                .fields()
                .iter()
                .zip(batch.columns())
                .map(|(field, array)| column_values(field.name(), array))
                .collect::<Result<Vec<_>, _>>()?;
            for row in 0..batch.num_rows() {
                rows.push(columns.iter().map(|c| c[row].clone()).collect());
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn source() -> InMemorySource {
        let table = Table::from_columns(vec![
            (
                "id",
                vec![DataValue::Int(1), DataValue::Int(2), DataValue::Int(2)],
            ),
            (
                "email",
                vec![DataValue::from("a@x.io"), DataValue::Null, DataValue::from("c@x.io")],
            ),
        ])
        .unwrap();
        InMemorySource::new(table).unwrap()
    }

    #[tokio::test]
    async fn test_materialize_projects() {
        let source = source();
        let table = source.materialize(&["email".to_string()]).await.unwrap();
        assert_eq!(table.column_names(), vec!["email"]);
        assert_eq!(source.io_debug().unwrap().columns, vec!["email"]);
    }

    #[tokio::test]
    async fn test_sql_endpoint() {
        let source = source();
        let rows = source
            .query("SELECT CAST(COUNT(*) AS BIGINT) FROM \"dataset\" WHERE \"email\" IS NULL")
            .await
            .unwrap();
        assert_eq!(rows, vec![vec![DataValue::Int(1)]]);
    }
}
