//! Rule kind registry.
//!
//! Maps a kind name to its declared parameters and constructor. The planner
//! receives a registry explicitly; there is no process-wide instance.

use contracts_core::{Contract, ContractError, RuleSpec};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::rules::{builtin_definitions, Rule, RuleConfig};

/// Builds a rule from its checked configuration.
pub type RuleConstructor = fn(&RuleConfig) -> Result<Box<dyn Rule>, ContractError>;

/// A parameter declared by a rule kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name
    pub name: &'static str,
    /// Whether the parameter must be present
    pub required: bool,
    /// One-line description
    pub description: &'static str,
}

impl ParamSpec {
    /// A required parameter.
    pub const fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: true,
            description,
        }
    }

    /// An optional parameter.
    pub const fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            required: false,
            description,
        }
    }
}

/// A registered rule kind.
#[derive(Debug, Clone)]
pub struct RuleDefinition {
    /// Kind name used in contracts
    pub kind: String,
    /// One-line description
    pub description: String,
    /// Closed parameter schema
    pub params: &'static [ParamSpec],
    build: RuleConstructor,
}

impl RuleDefinition {
    /// Creates a rule definition.
    pub fn new(
        kind: impl Into<String>,
        description: impl Into<String>,
        params: &'static [ParamSpec],
        build: RuleConstructor,
    ) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            params,
            build,
        }
    }

    fn same_constructor(&self, other: &RuleDefinition) -> bool {
        std::ptr::fn_addr_eq(self.build, other.build)
    }
}

/// Registry of rule kinds.
///
/// Registration is additive: registering a kind again with the same
/// constructor is a no-op, with a different one an error.
///
/// # Example
///
/// ```rust
/// use contracts_core::ContractBuilder;
/// use contracts_validator::RuleRegistry;
///
/// let registry = RuleRegistry::with_builtins();
/// let contract = ContractBuilder::new("users").not_null("email").min_rows(10).build();
///
/// let rules = registry.compile(&contract).unwrap();
/// assert_eq!(rules[0].id(), "not_null_1");
/// assert_eq!(rules[1].kind(), "min_rows");
/// ```
#[derive(Debug, Default)]
pub struct RuleRegistry {
    definitions: RwLock<HashMap<String, RuleDefinition>>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in rule kinds.
    pub fn with_builtins() -> Self {
        let definitions = builtin_definitions()
            .into_iter()
            .map(|definition| (definition.kind.clone(), definition))
            .collect();
        Self {
            definitions: RwLock::new(definitions),
        }
    }

    /// Registers a rule kind.
    pub fn register(&self, definition: RuleDefinition) -> Result<(), ContractError> {
        let mut definitions = self.definitions.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = definitions.get(&definition.kind) {
            if existing.same_constructor(&definition) {
                return Ok(());
            }
            return Err(ContractError::ConflictingRegistration(definition.kind));
        }
        debug!("Registered rule kind '{}'", definition.kind);
        definitions.insert(definition.kind.clone(), definition);
        Ok(())
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let definitions = self.definitions.read().unwrap_or_else(|e| e.into_inner());
        let mut kinds: Vec<String> = definitions.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Returns the definition of a kind.
    pub fn definition(&self, kind: &str) -> Option<RuleDefinition> {
        self.definitions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(kind)
            .cloned()
    }

    /// Builds one rule, checking its parameters against the kind's schema.
    ///
    /// `position` is the zero-based index of the rule in its contract and
    /// only matters for rules without an explicit id.
    pub fn build(&self, spec: &RuleSpec, position: usize) -> Result<Box<dyn Rule>, ContractError> {
        let id = spec.effective_id(position);
        let definition = self
            .definition(&spec.kind)
            .ok_or_else(|| ContractError::UnknownRuleKind {
                rule: id.clone(),
                kind: spec.kind.clone(),
            })?;

        if let Some(unknown) = spec
            .params
            .keys()
            .find(|key| !definition.params.iter().any(|p| p.name == key.as_str()))
        {
            return Err(ContractError::UnknownParameter {
                rule: id,
                kind: spec.kind.clone(),
                param: unknown.clone(),
            });
        }

        let config = RuleConfig::new(id, &spec.kind, spec.params.clone());
        if let Some(missing) = definition
            .params
            .iter()
            .find(|p| p.required && !config.has(p.name))
        {
            return Err(config.missing(missing.name));
        }

        (definition.build)(&config)
    }

    /// Compiles every rule of a contract, in contract order.
    ///
    /// Fails on the first invalid rule; no data source is involved.
    pub fn compile(&self, contract: &Contract) -> Result<Vec<Box<dyn Rule>>, ContractError> {
        contract.rule_ids()?;
        contract
            .rules
            .iter()
            .enumerate()
            .map(|(position, spec)| self.build(spec, position))
            .collect()
    }
}
