//! Iceberg addresses through the validation engine.

use contracts_core::ContractBuilder;
use contracts_iceberg::{CatalogType, IcebergConfig, IcebergConnector};
use contracts_validator::{
    ConnectorRegistry, DatasetAddress, RuleRegistry, RunError, RunOptions, SourceError,
    ValidationEngine,
};
use std::sync::Arc;

fn engine() -> ValidationEngine {
    let connectors = ConnectorRegistry::with_defaults();
    connectors.register(Arc::new(IcebergConnector));
    ValidationEngine::with_registries(Arc::new(RuleRegistry::with_builtins()), Arc::new(connectors))
}

#[test]
fn test_engine_dispatches_object_store_schemes() {
    let engine = engine();
    assert!(engine.connectors().connector("s3").is_ok());
    assert!(engine.connectors().connector("iceberg").is_ok());
    assert!(engine.connectors().connector("gs").is_err());
}

#[tokio::test]
async fn test_missing_table_is_a_source_error() {
    let contract = ContractBuilder::new("events")
        .dataset("iceberg://analytics/events?metadata=/nonexistent/metadata/v1.metadata.json")
        .not_null("event_id")
        .build();

    let err = engine().validate(&contract, RunOptions::new()).await.unwrap_err();
    assert!(matches!(err, RunError::Source(SourceError::NotFound(_))));
}

#[tokio::test]
async fn test_malformed_address_is_rejected() {
    let contract = ContractBuilder::new("events")
        .dataset("s3://bucket-only")
        .not_null("event_id")
        .build();

    let err = engine().validate(&contract, RunOptions::new()).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Source(SourceError::InvalidAddress { .. })
    ));
}

#[tokio::test]
async fn test_contract_errors_precede_catalog_access() {
    let contract = ContractBuilder::new("events")
        .dataset("iceberg://analytics/events")
        .rule(contracts_core::RuleSpec::new("not_null"))
        .build();

    let err = engine().validate(&contract, RunOptions::new()).await.unwrap_err();
    assert!(matches!(err, RunError::Contract(_)));
}

#[test]
fn test_multi_level_namespace_from_address() {
    let address = DatasetAddress::parse("iceberg://catalog.database.schema/table").unwrap();
    let config = IcebergConfig::from_address_with_env(&address, |key| match key {
        "REST_CATALOG_URI" => Some("http://localhost:8181".to_string()),
        "ICEBERG_WAREHOUSE" => Some("/warehouse".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.namespace.len(), 3);
    assert_eq!(config.warehouse(), Some("/warehouse"));
    assert!(matches!(config.catalog, CatalogType::Rest { .. }));
}

#[test]
fn test_config_serialization() {
    let config = IcebergConfig::builder()
        .catalog(CatalogType::Rest {
            uri: "http://localhost:8181".to_string(),
            warehouse: "/warehouse".to_string(),
        })
        .namespace(vec!["test".to_string()])
        .table_name("events")
        .property("s3.endpoint", "http://minio:9000")
        .build()
        .unwrap();

    let json = serde_json::to_string(&config).unwrap();
    let deserialized: IcebergConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, config);
}
