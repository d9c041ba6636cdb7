//! Local file connector: CSV, Parquet and newline-delimited JSON through
//! DataFusion.

use async_trait::async_trait;
use contracts_core::IoStats;
use datafusion::prelude::{
    CsvReadOptions, DataFrame, NdJsonReadOptions, ParquetReadOptions, SessionConfig, SessionContext,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info};

use super::{check_columns, io_stats, Connector, DatasetAddress, Materializer, FILE_SCHEME};
use crate::{SourceError, Table};

/// File format of a local dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalFormat {
    Csv,
    Parquet,
    NdJson,
}

impl LocalFormat {
    /// Detects the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(LocalFormat::Csv),
            "parquet" => Ok(LocalFormat::Parquet),
            "json" | "ndjson" | "jsonl" => Ok(LocalFormat::NdJson),
            other => Err(SourceError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }
}

/// Connector for `file://` addresses and bare paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileConnector;

#[async_trait]
impl Connector for LocalFileConnector {
    fn schemes(&self) -> Vec<String> {
        vec![FILE_SCHEME.to_string()]
    }

    async fn open(&self, address: &DatasetAddress) -> Result<Box<dyn Materializer>, SourceError> {
        Ok(Box::new(LocalFileSource::open(address.location())?))
    }
}

/// A CSV, Parquet or NDJSON file.
///
/// Reads go through a private DataFusion session so only the requested
/// columns are decoded; Parquet schemas come from the footer.
pub struct LocalFileSource {
    path: PathBuf,
    format: LocalFormat,
    ctx: SessionContext,
    last_io: Mutex<Option<IoStats>>,
}

/// Single-partition session: batches come back in file order, so row
/// positions are stable across runs.
fn scan_session() -> SessionContext {
    SessionContext::new_with_config(
        SessionConfig::new()
            .with_target_partitions(1)
            .with_repartition_file_scans(false),
    )
}

impl LocalFileSource {
    /// Opens a local file, detecting its format from the extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(SourceError::NotFound(path.display().to_string()));
        }
        let format = LocalFormat::from_path(&path)?;
        info!("Opened local {:?} dataset: {}", format, path.display());
        Ok(Self {
            path,
            format,
            ctx: scan_session(),
            last_io: Mutex::new(None),
        })
    }

    /// Detected file format.
    pub fn format(&self) -> LocalFormat {
        self.format
    }

    async fn read(&self) -> Result<DataFrame, SourceError> {
        let path = self
            .path
            .to_str()
            .ok_or_else(|| SourceError::invalid_address(self.path.display().to_string(), "path is not valid UTF-8"))?;
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();

        let df = match self.format {
            LocalFormat::Csv => {
                self.ctx
                    .read_csv(path, CsvReadOptions::new().file_extension(&extension))
                    .await?
            }
            LocalFormat::Parquet => {
                let options = ParquetReadOptions {
                    file_extension: &extension,
                    ..Default::default()
                };
                self.ctx.read_parquet(path, options).await?
            }
            LocalFormat::NdJson => {
                self.ctx
                    .read_json(path, NdJsonReadOptions::default().file_extension(&extension))
                    .await?
            }
        };
        Ok(df)
    }
}

#[async_trait]
impl Materializer for LocalFileSource {
    fn address(&self) -> &str {
        self.path.to_str().unwrap_or("<non-utf8 path>")
    }

    async fn schema(&self) -> Result<Vec<String>, SourceError> {
        let df = self.read().await?;
        Ok(df
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect())
    }

    async fn materialize(&self, columns: &[String]) -> Result<Table, SourceError> {
        let started = Instant::now();
        let df = self.read().await?;
        let available: Vec<String> = df.schema().fields().iter().map(|f| f.name().clone()).collect();
        check_columns(&available, columns)?;

        let table = if columns.is_empty() {
            let rows = df.count().await?;
            Table::with_row_count(rows)?
        } else {
            let names: Vec<&str> = columns.iter().map(String::as_str).collect();
            let df = df.select_columns(&names)?;
            let schema = df.schema().inner().clone();
            let batches = df.collect().await?;
            Table::from_batches(schema, &batches)?
        };

        let stats = io_stats(&table, columns, started);
        debug!(
            "Materialized {} rows x {} columns from {} in {}ms",
            stats.rows,
            columns.len(),
            self.path.display(),
            stats.elapsed_ms
        );
        *self.last_io.lock().unwrap_or_else(|e| e.into_inner()) = Some(stats);
        Ok(table)
    }

    fn io_debug(&self) -> Option<IoStats> {
        self.last_io.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
