//! # Data Contracts Validator
//!
//! Execution engine for data contracts. This crate turns declarative rules
//! into checks that run either locally over an in-memory columnar table or
//! as SQL pushed down to the source, and merges the outcomes into one
//! deterministic report:
//!
//! - Rule model and built-in rule kinds, behind a [`RuleRegistry`]
//! - Portable failure [`Predicate`]s, evaluated locally or rendered per
//!   SQL dialect by the [`SqlCompiler`]
//! - Connectors for local files, SQLite, PostgreSQL and in-memory tables
//! - The [`ExecutionPlanner`] and [`ResultAggregator`]
//!
//! ## Example
//!
//! ```rust
//! use contracts_core::{ContractBuilder, PushdownMode};
//! use contracts_validator::{DataValue, InMemorySource, RunOptions, Table, ValidationEngine};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let table = Table::from_columns(vec![
//!     ("user_id", vec![DataValue::Int(1), DataValue::Int(2), DataValue::Int(2)]),
//!     ("email", vec![DataValue::from("a@x.io"), DataValue::Null, DataValue::from("c@x.io")]),
//! ])
//! .unwrap();
//! let source = InMemorySource::new(table).unwrap();
//!
//! let contract = ContractBuilder::new("users")
//!     .not_null("email")
//!     .unique("user_id")
//!     .build();
//!
//! let engine = ValidationEngine::new();
//! let result = engine
//!     .validate_source(&contract, &source, RunOptions::new().pushdown(PushdownMode::Auto))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(result.summary.rules_failed, 2);
//! assert_eq!(result.result("unique_2").unwrap().failing_count, Some(2));
//! # });
//! ```

mod aggregator;
mod connector;
mod dataset;
mod engine;
mod error;
mod planner;
mod predicate;
mod registry;
pub mod rules;
pub mod sql;

pub use aggregator::*;
pub use connector::*;
pub use dataset::*;
pub use engine::*;
pub use error::*;
pub use planner::*;
pub use predicate::*;
pub use registry::*;
pub use rules::{Rule, RuleConfig};
pub use sql::{CompileError, SqlCompiler};
