//! Iceberg tables as a dataset source.

use async_trait::async_trait;
use contracts_core::IoStats;
use contracts_validator::{Connector, DatasetAddress, Materializer, SourceError, Table};
use futures::TryStreamExt;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

use crate::catalog::load_table;
use crate::{IcebergConfig, IcebergError};

/// Connector for `s3://` and `iceberg://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcebergConnector;

#[async_trait]
impl Connector for IcebergConnector {
    fn schemes(&self) -> Vec<String> {
        vec!["iceberg".to_string(), "s3".to_string()]
    }

    async fn open(&self, address: &DatasetAddress) -> Result<Box<dyn Materializer>, SourceError> {
        let config = IcebergConfig::from_address(address)
            .map_err(|e| e.into_source_error(address.as_str()))?;
        let source = IcebergSource::open(address.as_str(), config)
            .await
            .map_err(|e| e.into_source_error(address.as_str()))?;
        Ok(Box::new(source))
    }
}

/// An Iceberg table.
///
/// Table metadata is loaded once; every materialization plans a fresh scan
/// over the current snapshot selecting only the requested columns.
pub struct IcebergSource {
    address: String,
    config: IcebergConfig,
    table: iceberg::table::Table,
    columns: Vec<String>,
    last_io: Mutex<Option<IoStats>>,
}

impl IcebergSource {
    /// Loads table metadata.
    pub async fn open(address: impl Into<String>, config: IcebergConfig) -> Result<Self, IcebergError> {
        config.validate()?;
        let table = load_table(&config).await?;
        let columns = table
            .metadata()
            .current_schema()
            .as_struct()
            .fields()
            .iter()
            .map(|field| field.name.clone())
            .collect::<Vec<_>>();
        info!(
            "Opened Iceberg table {} with {} columns",
            config.qualified_name(),
            columns.len()
        );

        Ok(Self {
            address: address.into(),
            config,
            table,
            columns,
            last_io: Mutex::new(None),
        })
    }

    /// Connection settings.
    pub fn config(&self) -> &IcebergConfig {
        &self.config
    }

    async fn scan(&self, columns: &[String]) -> Result<Vec<arrow_array::RecordBatch>, IcebergError> {
        let scan = self
            .table
            .scan()
            .select(columns.iter().cloned())
            .build()
            .map_err(|e| IcebergError::DataReadError(format!("Failed to build scan: {}", e)))?;

        let stream = scan.to_arrow().await.map_err(|e| {
            IcebergError::DataReadError(format!("Failed to create arrow stream: {}", e))
        })?;

        stream
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| IcebergError::DataReadError(format!("Failed to read record batch: {}", e)))
    }
}

#[async_trait]
impl Materializer for IcebergSource {
    fn address(&self) -> &str {
        &self.address
    }

    async fn schema(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.columns.clone())
    }

    async fn materialize(&self, columns: &[String]) -> Result<Table, SourceError> {
        let started = Instant::now();
        if let Some(missing) = columns.iter().find(|c| !self.columns.contains(c)) {
            return Err(SourceError::MissingColumn(missing.clone()));
        }

        let table = if columns.is_empty() {
            // Row count only; scan the narrowest projection available.
            match self.columns.first() {
                Some(first) => {
                    let batches = self
                        .scan(std::slice::from_ref(first))
                        .await
                        .map_err(|e| e.into_source_error(&self.address))?;
                    Table::with_row_count(batches.iter().map(|b| b.num_rows()).sum())?
                }
                None => Table::with_row_count(0)?,
            }
        } else {
            let batches = self
                .scan(columns)
                .await
                .map_err(|e| e.into_source_error(&self.address))?;
            match batches.first() {
                Some(first) => Table::from_batches(first.schema(), &batches)?,
                None => Table::from_rows(columns, Vec::new())?,
            }
        };

        let stats = IoStats {
            bytes: table.memory_size() as u64,
            rows: table.num_rows() as u64,
            elapsed_ms: started.elapsed().as_millis() as u64,
            columns: columns.to_vec(),
        };
        debug!(
            "Scanned {} rows x {} columns from {} in {}ms",
            stats.rows,
            columns.len(),
            self.config.qualified_name(),
            stats.elapsed_ms
        );
        *self.last_io.lock().unwrap_or_else(|e| e.into_inner()) = Some(stats);
        Ok(table)
    }

    fn io_debug(&self) -> Option<IoStats> {
        self.last_io.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
