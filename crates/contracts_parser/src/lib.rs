//! Contract documents in YAML, TOML or JSON.
//!
//! Every format deserializes into the same [`Contract`]. Unknown keys at the
//! contract, option or rule level fail here; rule kinds and parameters are
//! checked later, when the contract is compiled against a rule registry.
//!
//! # Example
//!
//! ```rust
//! use contracts_parser::parse_yaml;
//!
//! let yaml = r#"
//! name: orders
//! dataset: sqlite://shop.db?table=orders
//! rules:
//!   - kind: not_null
//!     params: { column: customer_id }
//!   - id: one_row_per_order
//!     kind: unique
//!     params: { column: order_id }
//! "#;
//!
//! let contract = parse_yaml(yaml).unwrap();
//! assert_eq!(contract.rule_ids().unwrap(), vec!["not_null_1", "one_row_per_order"]);
//! ```

use contracts_core::Contract;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Failure to read or deserialize a contract document.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error("Invalid YAML contract: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Invalid TOML contract: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON contract: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot read contract: {0}")]
    Io(#[from] std::io::Error),

    /// Extension other than yml, yaml, toml or json
    #[error("Unsupported contract extension '.{0}'")]
    UnsupportedFormat(String),

    #[error("Contract path has no extension")]
    MissingExtension,
}

pub type Result<T> = std::result::Result<T, ParserError>;

/// Document format of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFormat {
    Yaml,
    Toml,
    Json,
}

impl ContractFormat {
    /// Picks the format from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or(ParserError::MissingExtension)?;

        match extension.to_ascii_lowercase().as_str() {
            "yml" | "yaml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(ParserError::UnsupportedFormat(extension.to_string())),
        }
    }
}

/// Deserializes a contract document in the given format.
pub fn parse_str(content: &str, format: ContractFormat) -> Result<Contract> {
    Ok(match format {
        ContractFormat::Yaml => serde_yaml_ng::from_str(content)?,
        ContractFormat::Toml => toml::from_str(content)?,
        ContractFormat::Json => serde_json::from_str(content)?,
    })
}

pub fn parse_yaml(content: &str) -> Result<Contract> {
    parse_str(content, ContractFormat::Yaml)
}

/// TOML contracts list rules as an array of tables:
///
/// ```rust
/// use contracts_parser::parse_toml;
///
/// let contract = parse_toml(r#"
/// name = "events"
/// dataset = "data/events.parquet"
///
/// [options]
/// pushdown = "off"
///
/// [[rules]]
/// kind = "min_rows"
/// params = { min = 1 }
/// "#).unwrap();
/// assert_eq!(contract.rules[0].kind, "min_rows");
/// ```
pub fn parse_toml(content: &str) -> Result<Contract> {
    parse_str(content, ContractFormat::Toml)
}

pub fn parse_json(content: &str) -> Result<Contract> {
    parse_str(content, ContractFormat::Json)
}

/// Reads a contract file, choosing the format from its extension.
///
/// ```no_run
/// use contracts_parser::parse_file;
/// use std::path::Path;
///
/// let contract = parse_file(Path::new("contracts/orders.toml")).unwrap();
/// println!("{} rules", contract.rules.len());
/// ```
pub fn parse_file(path: &Path) -> Result<Contract> {
    let format = ContractFormat::from_path(path)?;
    debug!("Reading {:?} contract {}", format, path.display());
    let content = std::fs::read_to_string(path)?;
    parse_str(&content, format)
}
