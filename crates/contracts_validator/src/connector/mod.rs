//! Connector and materializer boundary.
//!
//! A [`Connector`] turns a [`DatasetAddress`] into a [`Materializer`]. The
//! [`ConnectorRegistry`] picks the connector from the address scheme alone,
//! by exact match. Materializers backed by a query engine also expose a
//! [`SqlEndpoint`] that the planner pushes predicates to.

mod local;
mod memory;
mod postgres;
mod sqlite;

pub use local::{LocalFileConnector, LocalFileSource, LocalFormat};
pub use memory::InMemorySource;
pub use postgres::{PostgresConnector, PostgresSource};
pub use sqlite::{SqliteConnector, SqliteSource};

use async_trait::async_trait;
use contracts_core::{Dialect, IoStats};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::{DataValue, SourceError, Table};

/// Scheme of addresses without one.
pub const FILE_SCHEME: &str = "file";

/// Parsed dataset address: `<scheme>://<location>[?key=value&...]`.
///
/// An address without `://` is a local path.
///
/// # Example
///
/// ```rust
/// use contracts_validator::DatasetAddress;
///
/// let address = DatasetAddress::parse("sqlite://data/app.db?table=users").unwrap();
/// assert_eq!(address.scheme(), "sqlite");
/// assert_eq!(address.location(), "data/app.db");
/// assert_eq!(address.param("table"), Some("users"));
///
/// let local = DatasetAddress::parse("data/users.csv").unwrap();
/// assert_eq!(local.scheme(), "file");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetAddress {
    raw: String,
    scheme: String,
    location: String,
    params: BTreeMap<String, String>,
}

impl DatasetAddress {
    /// Parses an address.
    pub fn parse(raw: &str) -> Result<Self, SourceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(SourceError::invalid_address(raw, "address is empty"));
        }

        let (scheme, rest) = match raw.split_once("://") {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => (FILE_SCHEME.to_string(), raw),
        };
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(SourceError::invalid_address(raw, "malformed scheme"));
        }

        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };
        if location.is_empty() {
            return Err(SourceError::invalid_address(raw, "location is empty"));
        }

        let mut params = BTreeMap::new();
        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                SourceError::invalid_address(raw, format!("expected key=value, got '{}'", pair))
            })?;
            params.insert(key.to_string(), value.to_string());
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            location: location.to_string(),
            params,
        })
    }

    /// Address as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lowercased scheme; `file` for bare paths.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Everything between the scheme and the query string.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// All query parameters, sorted by key.
    pub fn params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Required query parameter.
    pub fn required_param(&self, key: &str) -> Result<&str, SourceError> {
        self.param(key).filter(|v| !v.is_empty()).ok_or_else(|| {
            SourceError::invalid_address(&self.raw, format!("missing '?{}=' parameter", key))
        })
    }
}

impl fmt::Display for DatasetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A query engine holding the dataset as one relation.
#[async_trait]
pub trait SqlEndpoint: Send + Sync {
    /// Native dialect of the engine.
    fn dialect(&self) -> Dialect;

    /// Relation name, possibly schema-qualified, unquoted.
    fn relation(&self) -> &str;

    /// Runs a query and returns its rows.
    async fn query(&self, sql: &str) -> Result<Vec<Vec<DataValue>>, SourceError>;
}

/// Produces column-projected tables from a dataset.
///
/// Implementations are side-effect free and may be called repeatedly.
#[async_trait]
pub trait Materializer: Send + Sync {
    /// Address of the dataset, for messages.
    fn address(&self) -> &str;

    /// Column names, reading no row data when metadata suffices.
    async fn schema(&self) -> Result<Vec<String>, SourceError>;

    /// Loads the requested columns.
    ///
    /// Fails with [`SourceError::MissingColumn`] if any is absent. An empty
    /// list yields a table with no columns and the dataset's row count.
    async fn materialize(&self, columns: &[String]) -> Result<Table, SourceError>;

    /// Diagnostics of the last materialization.
    fn io_debug(&self) -> Option<IoStats>;

    /// Query endpoint, for SQL-backed sources.
    fn sql(&self) -> Option<&dyn SqlEndpoint> {
        None
    }
}

/// Opens datasets for a set of address schemes.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Schemes this connector serves.
    fn schemes(&self) -> Vec<String>;

    /// Opens a dataset.
    async fn open(&self, address: &DatasetAddress) -> Result<Box<dyn Materializer>, SourceError>;
}

/// Scheme to connector dispatch table.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: RwLock<HashMap<String, Arc<dyn Connector>>>,
}

impl ConnectorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the local file, SQLite and PostgreSQL connectors.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(LocalFileConnector));
        registry.register(Arc::new(SqliteConnector));
        registry.register(Arc::new(PostgresConnector));
        registry
    }

    /// Registers a connector for each of its schemes, replacing earlier ones.
    pub fn register(&self, connector: Arc<dyn Connector>) {
        let mut connectors = self.connectors.write().unwrap_or_else(|e| e.into_inner());
        for scheme in connector.schemes() {
            debug!("Registered connector for scheme '{}'", scheme);
            connectors.insert(scheme.to_ascii_lowercase(), Arc::clone(&connector));
        }
    }

    /// Registered schemes, sorted.
    pub fn schemes(&self) -> Vec<String> {
        let connectors = self.connectors.read().unwrap_or_else(|e| e.into_inner());
        let mut schemes: Vec<String> = connectors.keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Connector serving a scheme.
    pub fn connector(&self, scheme: &str) -> Result<Arc<dyn Connector>, SourceError> {
        self.connectors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(scheme)
            .cloned()
            .ok_or_else(|| SourceError::UnknownScheme(scheme.to_string()))
    }

    /// Parses an address and opens it with the matching connector.
    pub async fn open(&self, address: &str) -> Result<Box<dyn Materializer>, SourceError> {
        let address = DatasetAddress::parse(address)?;
        let connector = self.connector(address.scheme())?;
        debug!("Opening '{}' via '{}' connector", address, address.scheme());
        connector.open(&address).await
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

/// Fails with the first requested column absent from `available`.
pub(crate) fn check_columns(available: &[String], requested: &[String]) -> Result<(), SourceError> {
    match requested.iter().find(|c| !available.contains(c)) {
        Some(missing) => Err(SourceError::MissingColumn(missing.clone())),
        None => Ok(()),
    }
}

/// Converts row-major query results into a table.
pub(crate) fn rows_to_table(
    columns: &[String],
    rows: Vec<Vec<DataValue>>,
) -> Result<Table, SourceError> {
    Table::from_rows(columns, rows).map_err(SourceError::from)
}

/// Records the diagnostics of one materialization.
pub(crate) fn io_stats(table: &Table, columns: &[String], started: std::time::Instant) -> IoStats {
    IoStats {
        bytes: table.memory_size() as u64,
        rows: table.num_rows() as u64,
        elapsed_ms: started.elapsed().as_millis() as u64,
        columns: columns.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_addresses() {
        let pg = DatasetAddress::parse("postgres://localhost:5432/shop?table=public.orders").unwrap();
        assert_eq!(pg.scheme(), "postgres");
        assert_eq!(pg.location(), "localhost:5432/shop");
        assert_eq!(pg.param("table"), Some("public.orders"));

        let file = DatasetAddress::parse("file:///tmp/users.csv").unwrap();
        assert_eq!(file.scheme(), "file");
        assert_eq!(file.location(), "/tmp/users.csv");

        let upper = DatasetAddress::parse("SQLITE://a.db?table=t").unwrap();
        assert_eq!(upper.scheme(), "sqlite");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(DatasetAddress::parse("").is_err());
        assert!(DatasetAddress::parse("://x").is_err());
        assert!(DatasetAddress::parse("sqlite://a.db?table").is_err());
        assert!(DatasetAddress::parse("s3://").is_err());
    }

    #[test]
    fn test_required_param() {
        let address = DatasetAddress::parse("sqlite://a.db").unwrap();
        assert!(matches!(
            address.required_param("table"),
            Err(SourceError::InvalidAddress { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_scheme_is_a_source_error() {
        let registry = ConnectorRegistry::with_defaults();
        let result = registry.open("ftp://host/file.csv").await;
        assert!(matches!(result, Err(SourceError::UnknownScheme(s)) if s == "ftp"));
    }

    #[test]
    fn test_dispatch_is_exact() {
        let registry = ConnectorRegistry::with_defaults();
        assert_eq!(registry.schemes(), vec!["file", "postgres", "postgresql", "sqlite"]);
        assert!(registry.connector("sql").is_err());
        assert!(registry.connector("sqlite3").is_err());
    }

    #[test]
    fn test_check_columns() {
        let available = vec!["a".to_string(), "b".to_string()];
        assert!(check_columns(&available, &["a".to_string()]).is_ok());
        assert!(matches!(
            check_columns(&available, &["c".to_string()]),
            Err(SourceError::MissingColumn(c)) if c == "c"
        ));
    }
}
