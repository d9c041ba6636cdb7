//! Catalog loading and table resolution.

use crate::{
    IcebergError,
    config::{CatalogType, IcebergConfig},
};
use iceberg::io::{FileIO, FileIOBuilder};
use iceberg::table::{StaticTable, Table};
use iceberg::{Catalog, TableIdent};

#[cfg(any(feature = "rest-catalog", feature = "glue-catalog", feature = "hms-catalog"))]
use iceberg::CatalogBuilder;

#[cfg(feature = "glue-catalog")]
use iceberg_catalog_glue::{GLUE_CATALOG_PROP_WAREHOUSE, GlueCatalogBuilder};

#[cfg(feature = "hms-catalog")]
use iceberg_catalog_hms::{HMS_CATALOG_PROP_URI, HMS_CATALOG_PROP_WAREHOUSE, HmsCatalogBuilder};

#[cfg(feature = "rest-catalog")]
use iceberg_catalog_rest::{REST_CATALOG_PROP_URI, REST_CATALOG_PROP_WAREHOUSE, RestCatalogBuilder};

#[cfg(any(feature = "rest-catalog", feature = "glue-catalog", feature = "hms-catalog"))]
use std::collections::HashMap;
use tracing::{debug, info};

/// Resolves the configured table, through its catalog or straight from a
/// metadata file.
pub async fn load_table(config: &IcebergConfig) -> Result<Table, IcebergError> {
    let ident = create_table_ident(&config.namespace, &config.table_name)?;
    info!("Loading Iceberg table: {}", ident);

    match &config.catalog {
        CatalogType::FileIO { metadata_location } => {
            let file_io = build_file_io(Some(metadata_location), config)?;
            StaticTable::from_metadata_file(metadata_location, ident.clone(), file_io)
                .await
                .map(StaticTable::into_table)
                .map_err(|e| IcebergError::TableNotFound(format!("{}: {}", ident, e)))
        }
        _ => {
            let catalog = load_catalog(config).await?;
            catalog
                .load_table(&ident)
                .await
                .map_err(|e| IcebergError::TableNotFound(format!("{}: {}", ident, e)))
        }
    }
}

/// Loads the catalog named by the configuration.
pub async fn load_catalog(config: &IcebergConfig) -> Result<Box<dyn Catalog>, IcebergError> {
    match &config.catalog {
        CatalogType::FileIO { .. } => Err(IcebergError::UnsupportedOperation(
            "metadata-file tables have no catalog".to_string(),
        )),
        #[cfg(feature = "rest-catalog")]
        CatalogType::Rest { uri, warehouse } => {
            info!("Connecting to REST catalog at {}", uri);
            let mut props = catalog_props(config);
            props.insert(REST_CATALOG_PROP_URI.to_string(), uri.clone());
            props.insert(REST_CATALOG_PROP_WAREHOUSE.to_string(), warehouse.clone());
            debug!("REST catalog properties: {:?}", props.keys());

            let catalog = RestCatalogBuilder::default()
                .load("rest", props)
                .await
                .map_err(|e| {
                    IcebergError::ConnectionError(format!("rest catalog: {}", e))
                })?;
            Ok(Box::new(catalog))
        }
        #[cfg(not(feature = "rest-catalog"))]
        CatalogType::Rest { .. } => Err(IcebergError::UnsupportedOperation(
            "rest catalogs need the 'rest-catalog' feature".to_string(),
        )),
        #[cfg(feature = "glue-catalog")]
        CatalogType::Glue { warehouse } => {
            info!("Connecting to Glue catalog for {}", warehouse);
            let mut props = catalog_props(config);
            props.insert(GLUE_CATALOG_PROP_WAREHOUSE.to_string(), warehouse.clone());

            let catalog = GlueCatalogBuilder::default()
                .load("glue", props)
                .await
                .map_err(|e| {
                    IcebergError::ConnectionError(format!("glue catalog: {}", e))
                })?;
            Ok(Box::new(catalog))
        }
        #[cfg(not(feature = "glue-catalog"))]
        CatalogType::Glue { .. } => Err(IcebergError::UnsupportedOperation(
            "glue catalogs need the 'glue-catalog' feature".to_string(),
        )),
        #[cfg(feature = "hms-catalog")]
        CatalogType::Hms { uri, warehouse } => {
            info!("Connecting to Hive Metastore at {}", uri);
            let mut props = catalog_props(config);
            props.insert(HMS_CATALOG_PROP_URI.to_string(), uri.clone());
            props.insert(HMS_CATALOG_PROP_WAREHOUSE.to_string(), warehouse.clone());

            let catalog = HmsCatalogBuilder::default()
                .load("hms", props)
                .await
                .map_err(|e| {
                    IcebergError::ConnectionError(format!("hms catalog: {}", e))
                })?;
            Ok(Box::new(catalog))
        }
        #[cfg(not(feature = "hms-catalog"))]
        CatalogType::Hms { .. } => Err(IcebergError::UnsupportedOperation(
            "hms catalogs need the 'hms-catalog' feature".to_string(),
        )),
    }
}

#[cfg(any(feature = "rest-catalog", feature = "glue-catalog", feature = "hms-catalog"))]
fn catalog_props(config: &IcebergConfig) -> HashMap<String, String> {
    config.properties.clone()
}

/// Namespace levels followed by the table name.
pub fn create_table_ident(
    namespace: &[String],
    table_name: &str,
) -> Result<TableIdent, IcebergError> {
    TableIdent::from_strs(namespace.iter().map(String::as_str).chain([table_name]))
        .map_err(|e| IcebergError::ConfigurationError(format!("table identifier: {}", e)))
}

/// Builds a FileIO for the scheme of `location`; plain paths use the local
/// filesystem.
pub fn build_file_io(location: Option<&str>, config: &IcebergConfig) -> Result<FileIO, IcebergError> {
    let scheme = location
        .and_then(|l| l.split_once("://"))
        .map(|(scheme, _)| scheme)
        .unwrap_or("file");

    debug!("Building FileIO for scheme: {}", scheme);

    FileIOBuilder::new(scheme)
        .with_props(config.properties.iter())
        .build()
        .map_err(|e| IcebergError::ConnectionError(format!("file IO for {}: {}", scheme, e)))
}
