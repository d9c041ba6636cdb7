//! Table location and catalog settings.
//!
//! A config is normally derived from a dataset address plus the process
//! environment; the builder covers programmatic use.

use crate::IcebergError;
use contracts_validator::DatasetAddress;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment variables naming the REST catalog endpoint, in lookup order.
pub const REST_URI_VARS: [&str; 2] = ["REST_CATALOG_URI", "ICEBERG_REST_URI"];

/// Environment variables naming the warehouse, in lookup order.
pub const WAREHOUSE_VARS: [&str; 2] = ["WAREHOUSE", "ICEBERG_WAREHOUSE"];

/// Environment variable naming the Hive Metastore endpoint.
pub const HMS_URI_VAR: &str = "HMS_URI";

/// Where table metadata is looked up.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CatalogType {
    /// Catalog-free: the table is read from one metadata JSON file
    FileIO { metadata_location: String },
    Rest { uri: String, warehouse: String },
    /// AWS Glue; the region and credentials come from the AWS environment
    Glue { warehouse: String },
    /// Hive Metastore, `uri` is `host:port`
    Hms { uri: String, warehouse: String },
}

/// Location of one Iceberg table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IcebergConfig {
    pub catalog: CatalogType,
    /// Namespace levels, outermost first
    pub namespace: Vec<String>,
    pub table_name: String,
    /// Passed through to the catalog and FileIO (`s3.region`, credentials, ...)
    pub properties: HashMap<String, String>,
}

impl IcebergConfig {
    pub fn builder() -> IcebergConfigBuilder {
        IcebergConfigBuilder::default()
    }

    /// Derives a config from an `s3://` or `iceberg://` address and the
    /// process environment.
    pub fn from_address(address: &DatasetAddress) -> Result<Self, IcebergError> {
        Self::from_address_with_env(address, |key| std::env::var(key).ok())
    }

    /// Derives a config from an address, reading settings through `env`.
    ///
    /// - `iceberg://<namespace>/<table>`: warehouse from `WAREHOUSE` or
    ///   `ICEBERG_WAREHOUSE`.
    /// - `s3://<bucket>/<path>/<namespace>/<table>`: warehouse is
    ///   `s3://<bucket>/<path>`.
    ///
    /// The catalog is REST (`REST_CATALOG_URI` or `ICEBERG_REST_URI`) unless
    /// the address carries `?catalog=glue|hms`, or `?metadata=<file>` for
    /// catalog-free access. Other query parameters become catalog properties.
    pub fn from_address_with_env<F>(address: &DatasetAddress, env: F) -> Result<Self, IcebergError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let segments: Vec<&str> = address
            .location()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let (warehouse, namespace, table_name) = match (address.scheme(), segments.as_slice()) {
            ("s3", [bucket, rest @ .., namespace, table]) => (
                Some(
                    std::iter::once(format!("s3://{}", bucket))
                        .chain(rest.iter().map(|s| s.to_string()))
                        .collect::<Vec<_>>()
                        .join("/"),
                ),
                *namespace,
                *table,
            ),
            ("s3", _) => {
                return Err(IcebergError::ConfigurationError(
                    "expected s3://<bucket>/<namespace>/<table>".to_string(),
                ));
            }
            (_, [namespace, table]) => (first_env(&env, &WAREHOUSE_VARS), *namespace, *table),
            _ => {
                return Err(IcebergError::ConfigurationError(
                    "expected iceberg://<namespace>/<table>".to_string(),
                ));
            }
        };

        let warehouse = || {
            warehouse.clone().ok_or_else(|| {
                IcebergError::ConfigurationError(format!(
                    "warehouse is required; set {}",
                    WAREHOUSE_VARS.join(" or ")
                ))
            })
        };

        let catalog = match (address.param("metadata"), address.param("catalog")) {
            (Some(metadata), _) => CatalogType::FileIO {
                metadata_location: metadata.to_string(),
            },
            (None, None | Some("rest")) => CatalogType::Rest {
                uri: first_env(&env, &REST_URI_VARS).ok_or_else(|| {
                    IcebergError::ConfigurationError(format!(
                        "REST catalog URI is required; set {}",
                        REST_URI_VARS.join(" or ")
                    ))
                })?,
                warehouse: warehouse()?,
            },
            (None, Some("glue")) => CatalogType::Glue {
                warehouse: warehouse()?,
            },
            (None, Some("hms")) => CatalogType::Hms {
                uri: env(HMS_URI_VAR).ok_or_else(|| {
                    IcebergError::ConfigurationError(format!(
                        "Hive Metastore URI is required; set {}",
                        HMS_URI_VAR
                    ))
                })?,
                warehouse: warehouse()?,
            },
            (None, Some(other)) => {
                return Err(IcebergError::ConfigurationError(format!(
                    "unknown catalog type '{}', expected rest, glue or hms",
                    other
                )));
            }
        };

        let mut builder = Self::builder()
            .catalog(catalog)
            .namespace(namespace.split('.').map(str::to_string).collect())
            .table_name(table_name);
        for (key, value) in address.params() {
            if key != "metadata" && key != "catalog" {
                builder = builder.property(key, value);
            }
        }
        builder.build()
    }

    /// Rejects an empty table name or namespace level.
    pub fn validate(&self) -> Result<(), IcebergError> {
        let blank_level = self.namespace.iter().any(|level| level.trim().is_empty());
        match (self.table_name.trim().is_empty(), self.namespace.is_empty() || blank_level) {
            (true, _) => Err(IcebergError::ConfigurationError(format!(
                "empty table name in '{}'",
                self.qualified_name()
            ))),
            (_, true) => Err(IcebergError::ConfigurationError(format!(
                "empty namespace level in '{}'",
                self.qualified_name()
            ))),
            _ => Ok(()),
        }
    }

    /// Warehouse root, absent for catalog-free tables.
    pub fn warehouse(&self) -> Option<&str> {
        match &self.catalog {
            CatalogType::FileIO { .. } => None,
            CatalogType::Rest { warehouse, .. }
            | CatalogType::Glue { warehouse }
            | CatalogType::Hms { warehouse, .. } => Some(warehouse),
        }
    }

    /// Dotted table identifier, e.g. `db.events`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace.join("."), self.table_name)
    }
}

fn first_env<F>(env: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| env(key))
        .find(|value| !value.trim().is_empty())
}

/// Assembles an [`IcebergConfig`] outside of address parsing.
///
/// ```rust
/// use contracts_iceberg::IcebergConfig;
///
/// let config = IcebergConfig::builder()
///     .metadata_file("/lake/db/events/metadata/v3.metadata.json")
///     .namespace(vec!["db".to_string()])
///     .table_name("events")
///     .build()
///     .unwrap();
/// assert_eq!(config.qualified_name(), "db.events");
/// ```
#[derive(Debug, Clone, Default)]
pub struct IcebergConfigBuilder {
    catalog: Option<CatalogType>,
    namespace: Option<Vec<String>>,
    table_name: Option<String>,
    properties: HashMap<String, String>,
}

impl IcebergConfigBuilder {
    pub fn catalog(mut self, catalog: CatalogType) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Shorthand for a catalog-free table.
    pub fn metadata_file(self, metadata_location: impl Into<String>) -> Self {
        self.catalog(CatalogType::FileIO {
            metadata_location: metadata_location.into(),
        })
    }

    pub fn namespace(mut self, levels: Vec<String>) -> Self {
        self.namespace = Some(levels);
        self
    }

    pub fn table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Fails when the catalog, namespace or table is unset or blank.
    pub fn build(self) -> Result<IcebergConfig, IcebergError> {
        let missing = |field: &str| IcebergError::ConfigurationError(format!("{} is not set", field));
        let config = IcebergConfig {
            catalog: self.catalog.ok_or_else(|| missing("catalog"))?,
            namespace: self.namespace.ok_or_else(|| missing("namespace"))?,
            table_name: self.table_name.ok_or_else(|| missing("table name"))?,
            properties: self.properties,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    fn address(raw: &str) -> DatasetAddress {
        DatasetAddress::parse(raw).unwrap()
    }

    #[test]
    fn test_iceberg_address_uses_env() {
        let config = IcebergConfig::from_address_with_env(
            &address("iceberg://analytics/events"),
            env(&[
                ("ICEBERG_REST_URI", "http://localhost:8181"),
                ("WAREHOUSE", "s3://lake/warehouse"),
            ]),
        )
        .unwrap();

        assert_eq!(config.namespace, vec!["analytics".to_string()]);
        assert_eq!(config.table_name, "events");
        assert_eq!(
            config.catalog,
            CatalogType::Rest {
                uri: "http://localhost:8181".to_string(),
                warehouse: "s3://lake/warehouse".to_string(),
            }
        );
    }

    #[test]
    fn test_rest_uri_lookup_order() {
        let config = IcebergConfig::from_address_with_env(
            &address("iceberg://db/t"),
            env(&[
                ("REST_CATALOG_URI", "http://primary:8181"),
                ("ICEBERG_REST_URI", "http://fallback:8181"),
                ("ICEBERG_WAREHOUSE", "wh"),
            ]),
        )
        .unwrap();
        assert!(matches!(config.catalog, CatalogType::Rest { ref uri, .. } if uri == "http://primary:8181"));
    }

    #[test]
    fn test_s3_address_carries_warehouse() {
        let config = IcebergConfig::from_address_with_env(
            &address("s3://lake/warehouse/sales.eu/orders"),
            env(&[("REST_CATALOG_URI", "http://catalog:8181")]),
        )
        .unwrap();

        assert_eq!(config.warehouse(), Some("s3://lake/warehouse"));
        assert_eq!(config.namespace, vec!["sales".to_string(), "eu".to_string()]);
        assert_eq!(config.qualified_name(), "sales.eu.orders");
    }

    #[test]
    fn test_missing_catalog_uri() {
        let err = IcebergConfig::from_address_with_env(
            &address("iceberg://db/t"),
            env(&[("WAREHOUSE", "wh")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("REST_CATALOG_URI"));
    }

    #[test]
    fn test_missing_warehouse() {
        let err = IcebergConfig::from_address_with_env(
            &address("iceberg://db/t"),
            env(&[("REST_CATALOG_URI", "http://c:8181")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("WAREHOUSE"));
    }

    #[test]
    fn test_catalog_param_and_properties() {
        let config = IcebergConfig::from_address_with_env(
            &address("s3://lake/db/t?catalog=glue&s3.region=eu-west-1"),
            env(&[]),
        )
        .unwrap();
        assert_eq!(
            config.catalog,
            CatalogType::Glue {
                warehouse: "s3://lake".to_string()
            }
        );
        assert_eq!(config.properties.get("s3.region").map(String::as_str), Some("eu-west-1"));

        let config = IcebergConfig::from_address_with_env(
            &address("iceberg://db/t?metadata=/tmp/t/metadata/v1.metadata.json"),
            env(&[]),
        )
        .unwrap();
        assert_eq!(config.warehouse(), None);
        assert!(config.properties.is_empty());
    }

    #[test]
    fn test_malformed_addresses() {
        assert!(IcebergConfig::from_address_with_env(&address("iceberg://only"), env(&[])).is_err());
        assert!(IcebergConfig::from_address_with_env(&address("s3://bucket/t"), env(&[])).is_err());
        assert!(
            IcebergConfig::from_address_with_env(&address("iceberg://db/t?catalog=nessie"), env(&[]))
                .is_err()
        );
    }

    #[test]
    fn test_builder_rejects_unset_or_blank_parts() {
        let glue = || CatalogType::Glue {
            warehouse: "s3://wh".to_string(),
        };
        assert!(IcebergConfig::builder().table_name("t").build().is_err());
        assert!(IcebergConfig::builder().catalog(glue()).table_name("t").build().is_err());

        let err = IcebergConfig::builder()
            .catalog(glue())
            .namespace(vec!["db".to_string(), " ".to_string()])
            .table_name("t")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("empty namespace level"));

        let err = IcebergConfig::builder()
            .catalog(glue())
            .namespace(vec!["db".to_string()])
            .table_name("")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("empty table name"));
    }

    #[test]
    fn test_catalog_is_tagged_by_type() {
        let catalog = CatalogType::Hms {
            uri: "metastore:9083".to_string(),
            warehouse: "s3://lake".to_string(),
        };

        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["type"], "hms");
        assert_eq!(serde_json::from_value::<CatalogType>(json).unwrap(), catalog);
    }
}
