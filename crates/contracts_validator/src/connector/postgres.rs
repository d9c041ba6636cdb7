//! PostgreSQL connector (`postgres://<host>[:port]/<db>?table=<schema.table>`).
//!
//! Credentials come from `DCE_PG_USER` / `DCE_PG_PASSWORD`, falling back to
//! the libpq variables `PGUSER` / `PGPASSWORD`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use contracts_core::{Dialect, IoStats};
use std::sync::Mutex;
use std::time::Instant;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, Config as PgConfig, NoTls, Row};
use tracing::{debug, info, warn};

use super::{
    check_columns, io_stats, rows_to_table, Connector, DatasetAddress, Materializer, SqlEndpoint,
};
use crate::sql::{dialect_for, SqlDialect};
use crate::{DataValue, SourceError, Table};

const DEFAULT_PORT: u16 = 5432;
const DEFAULT_SCHEMA: &str = "public";

/// Connector for `postgres://` and `postgresql://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

#[async_trait]
impl Connector for PostgresConnector {
    fn schemes(&self) -> Vec<String> {
        vec!["postgres".to_string(), "postgresql".to_string()]
    }

    async fn open(&self, address: &DatasetAddress) -> Result<Box<dyn Materializer>, SourceError> {
        Ok(Box::new(PostgresSource::open(address).await?))
    }
}

/// Connection settings parsed from an address plus environment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    host: String,
    port: u16,
    database: String,
    user: Option<String>,
    password: Option<String>,
    schema: String,
    table: String,
}

impl Settings {
    fn from_address(address: &DatasetAddress) -> Result<Self, SourceError> {
        let (authority, database) = address
            .location()
            .split_once('/')
            .filter(|(_, db)| !db.is_empty())
            .ok_or_else(|| SourceError::invalid_address(address.as_str(), "expected host[:port]/database"))?;

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (
                host,
                port.parse::<u16>().map_err(|_| {
                    SourceError::invalid_address(address.as_str(), format!("invalid port '{}'", port))
                })?,
            ),
            None => (authority, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(SourceError::invalid_address(address.as_str(), "host is empty"));
        }

        let table = address.required_param("table")?;
        let (schema, table) = match table.split_once('.') {
            Some((schema, table)) => (schema, table),
            None => (DEFAULT_SCHEMA, table),
        };

        Ok(Self {
            host: host.to_string(),
            port,
            database: database.to_string(),
            user: env_var("DCE_PG_USER").or_else(|| env_var("PGUSER")),
            password: env_var("DCE_PG_PASSWORD").or_else(|| env_var("PGPASSWORD")),
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// One table of a PostgreSQL database.
pub struct PostgresSource {
    address: String,
    relation: String,
    client: Client,
    columns: Vec<(String, String)>,
    last_io: Mutex<Option<IoStats>>,
}

impl PostgresSource {
    /// Connects and reads the table's column metadata.
    pub async fn open(address: &DatasetAddress) -> Result<Self, SourceError> {
        let settings = Settings::from_address(address)?;

        let mut pg = PgConfig::new();
        pg.host(&settings.host);
        pg.port(settings.port);
        pg.dbname(&settings.database);
        if let Some(user) = &settings.user {
            pg.user(user);
        }
        if let Some(password) = &settings.password {
            pg.password(password);
        }

        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| SourceError::Connection(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection error: {}", e);
            }
        });

        let rows = client
            .query(
                "SELECT column_name::text, data_type::text FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
                &[&settings.schema, &settings.table],
            )
            .await?;
        let columns: Vec<(String, String)> = rows
            .iter()
            .map(|row| Ok((row.try_get(0)?, row.try_get(1)?)))
            .collect::<Result<_, tokio_postgres::Error>>()?;
        if columns.is_empty() {
            return Err(SourceError::NotFound(format!(
                "table '{}.{}' in {}",
                settings.schema, settings.table, settings.database
            )));
        }

        info!(
            "Connected to {}:{}/{} (table {}.{}, {} columns)",
            settings.host,
            settings.port,
            settings.database,
            settings.schema,
            settings.table,
            columns.len()
        );

        Ok(Self {
            address: address.as_str().to_string(),
            relation: format!("{}.{}", settings.schema, settings.table),
            client,
            columns,
            last_io: Mutex::new(None),
        })
    }

    fn dialect_impl(&self) -> &'static dyn SqlDialect {
        dialect_for(Dialect::Postgres)
    }

    fn quoted_relation(&self) -> String {
        let dialect = self.dialect_impl();
        self.relation
            .split('.')
            .map(|part| dialect.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Select-list item for a column, casting types without a value mapping.
    fn select_item(&self, column: &str) -> String {
        let quoted = self.dialect_impl().quote_identifier(column);
        let data_type = self
            .columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, t)| t.as_str())
            .unwrap_or("");
        match data_type {
            "boolean" | "smallint" | "integer" | "bigint" | "real" | "double precision"
            | "text" | "character varying" | "character" | "date"
            | "timestamp without time zone" | "timestamp with time zone" => quoted,
            "numeric" | "decimal" | "money" => format!("{}::float8 AS {}", quoted, quoted),
            _ => format!("{}::text AS {}", quoted, quoted),
        }
    }

    async fn run(&self, sql: &str) -> Result<Vec<Vec<DataValue>>, SourceError> {
        debug!("PostgreSQL query: {}", sql);
        let rows = self.client.query(sql, &[]).await?;
        rows.iter().map(row_values).collect()
    }
}

fn row_values(row: &Row) -> Result<Vec<DataValue>, SourceError> {
    (0..row.len()).map(|i| pg_value(row, i)).collect()
}

/// Decodes one cell by its PostgreSQL type.
fn pg_value(row: &Row, i: usize) -> Result<DataValue, SourceError> {
    let column = &row.columns()[i];
    let value = match *column.type_() {
        Type::BOOL => row.try_get::<_, Option<bool>>(i)?.into(),
        Type::INT2 => row.try_get::<_, Option<i16>>(i)?.map(i64::from).into(),
        Type::INT4 => row.try_get::<_, Option<i32>>(i)?.map(i64::from).into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(i)?.into(),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(i)?.map(f64::from).into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(i)?.into(),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(i)?.into()
        }
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(i)?
            .map(|d| DataValue::Timestamp(d.to_string()))
            .unwrap_or(DataValue::Null),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(i)?
            .map(|ts| DataValue::Timestamp(ts.and_utc().to_rfc3339()))
            .unwrap_or(DataValue::Null),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(i)?
            .map(|ts| DataValue::Timestamp(ts.to_rfc3339()))
            .unwrap_or(DataValue::Null),
        ref other => {
            return Err(SourceError::Query(format!(
                "column '{}' has unsupported type {}",
                column.name(),
                other
            )));
        }
    };
    Ok(value)
}

/// Projection over every row, ordered by all selected columns.
///
/// Heap order is not stable, so local row positions come from this order.
fn projection_query(items: &[String], relation: &str) -> String {
    let order = (1..=items.len())
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {} ORDER BY {}", items.join(", "), relation, order)
}

#[async_trait]
impl Materializer for PostgresSource {
    fn address(&self) -> &str {
        &self.address
    }

    async fn schema(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.columns.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn materialize(&self, columns: &[String]) -> Result<Table, SourceError> {
        let started = Instant::now();
        let available = self.schema().await?;
        check_columns(&available, columns)?;

        let table = if columns.is_empty() {
            let rows = self
                .run(&format!("SELECT COUNT(*) FROM {}", self.quoted_relation()))
                .await?;
            let count = rows
                .first()
                .and_then(|r| r.first())
                .and_then(DataValue::as_int)
                .unwrap_or(0);
            Table::with_row_count(count as usize)?
        } else {
            let items: Vec<String> = columns.iter().map(|c| self.select_item(c)).collect();
            let rows = self
                .run(&projection_query(&items, &self.quoted_relation()))
                .await?;
            rows_to_table(columns, rows)?
        };

        let stats = io_stats(&table, columns, started);
        debug!("Materialized {} rows from {}", stats.rows, self.relation);
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
impl SqlEndpoint for PostgresSource {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn relation(&self) -> &str {
        &self.relation
    }

    async fn query(&self, sql: &str) -> Result<Vec<Vec<DataValue>>, SourceError> {
        self.run(sql).await
    }
}
