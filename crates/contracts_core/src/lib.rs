//! # Data Contracts Core
//!
//! Core data structures and types for the Data Contracts Engine.
//!
//! This crate provides the fundamental building blocks shared by the parser,
//! the validation engine and the CLI. A data contract is an ordered list of
//! configured rules bound to a dataset address, plus the execution options
//! that steer how those rules run.
//!
//! ## Key Concepts
//!
//! - **Contract**: rule configurations, dataset address and execution options
//! - **RuleSpec**: one rule's kind, optional identifier and parameters
//! - **ExecutionOptions**: pushdown mode, stats verbosity, sampling, dialect
//! - **ValidationResult**: the deterministic report produced by a run
//!
//! ## Example
//!
//! ```rust
//! use contracts_core::{ContractBuilder, PushdownMode, RuleSpec};
//!
//! let contract = ContractBuilder::new("user_events")
//!     .owner("analytics-team")
//!     .dataset("data/user_events.parquet")
//!     .pushdown(PushdownMode::Auto)
//!     .not_null("user_id")
//!     .rule(
//!         RuleSpec::new("allowed_values")
//!             .param("column", "event_type")
//!             .param("values", vec!["click", "view", "purchase"]),
//!     )
//!     .build();
//!
//! assert_eq!(contract.rule_ids().unwrap(), vec!["not_null_1", "allowed_values_2"]);
//! ```

pub mod builder;
pub mod contract;
pub mod error;
pub mod result;

pub use builder::*;
pub use contract::*;
pub use error::*;
pub use result::*;
