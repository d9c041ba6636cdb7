//! Iceberg tables as contract datasets.
//!
//! Provides a [`Connector`](contracts_validator::Connector) for `s3://` and
//! `iceberg://` dataset addresses. Tables are resolved through a REST, Glue
//! or Hive Metastore catalog (or straight from a metadata file) and read
//! with column-projected scans. Iceberg sources are not SQL-backed: every
//! rule runs locally over the materialized columns.
//!
//! # Example
//!
//! ```no_run
//! use contracts_iceberg::IcebergConnector;
//! use contracts_validator::{ConnectorRegistry, RuleRegistry, RunOptions, ValidationEngine};
//! use std::sync::Arc;
//!
//! # async fn example(contract: contracts_core::Contract) -> Result<(), Box<dyn std::error::Error>> {
//! // REST_CATALOG_URI and WAREHOUSE are read from the environment
//! let connectors = ConnectorRegistry::with_defaults();
//! connectors.register(Arc::new(IcebergConnector));
//!
//! let engine = ValidationEngine::with_registries(
//!     Arc::new(RuleRegistry::with_builtins()),
//!     Arc::new(connectors),
//! );
//! let result = engine
//!     .validate(&contract, RunOptions::new().dataset("iceberg://analytics/events"))
//!     .await?;
//! println!("{} rules failed", result.summary.rules_failed);
//! # Ok(())
//! # }
//! ```

use contracts_validator::SourceError;
use thiserror::Error;

mod catalog;
mod config;
mod source;

pub use catalog::{build_file_io, create_table_ident, load_catalog, load_table};
pub use config::{CatalogType, IcebergConfig, IcebergConfigBuilder};
pub use source::{IcebergConnector, IcebergSource};

/// Failure while resolving or reading an Iceberg table.
#[derive(Error, Debug)]
pub enum IcebergError {
    /// Catalog or object store unreachable
    #[error("Iceberg catalog unavailable: {0}")]
    ConnectionError(String),

    #[error("Iceberg table {0} does not exist")]
    TableNotFound(String),

    /// Scan planning or Arrow conversion failed
    #[error("Cannot read Iceberg table: {0}")]
    DataReadError(String),

    /// Address or environment does not describe a table
    #[error("Bad Iceberg settings: {0}")]
    ConfigurationError(String),

    /// Catalog kind compiled out, or not applicable
    #[error("Not supported for Iceberg: {0}")]
    UnsupportedOperation(String),

    #[error(transparent)]
    Other(#[from] iceberg::Error),
}

impl IcebergError {
    /// Converts into the connector error for `address`.
    pub fn into_source_error(self, address: &str) -> SourceError {
        match self {
            IcebergError::TableNotFound(table) => SourceError::NotFound(table),
            IcebergError::ConnectionError(message) => SourceError::Connection(message),
            IcebergError::DataReadError(message) => SourceError::Read(message),
            IcebergError::ConfigurationError(message) => {
                SourceError::invalid_address(address, message)
            }
            other => SourceError::Connection(other.to_string()),
        }
    }
}
