//! Renders predicates as dialect-specific SQL.
//!
//! Every failing-row count is produced by the same expression shape:
//!
//! ```sql
//! CAST(COALESCE(SUM(CASE WHEN COALESCE((<condition>), FALSE) THEN 1 ELSE 0 END), 0) AS BIGINT)
//! ```
//!
//! The inner `COALESCE` turns an unknown (`NULL`) condition into "not
//! failing", which is exactly how [`Predicate::failing_rows`] treats unknown
//! values locally.
//!
//! Duplicate detection needs a window over the whole relation, so when any
//! predicate uses it the relation is wrapped in a derived table carrying one
//! `COUNT(*) OVER (PARTITION BY ...)` column per distinct key. A batched query
//! still scans the relation once.

use contracts_core::Dialect;
use std::fmt;

use super::{CompileError, SqlDialect, dialect_for};
use crate::predicate::{Condition, Literal, Predicate};

/// Alias of the total row count column in a count query.
pub const TOTAL_ALIAS: &str = "__total";

const SOURCE_ALIAS: &str = "__src";

/// A count query covering one or more predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    /// SQL text
    pub sql: String,
    /// Rule ids, in the order of the count columns following the total
    pub rule_ids: Vec<String>,
}

/// SQL compiler for one dialect.
///
/// # Example
///
/// ```rust
/// use contracts_core::Dialect;
/// use contracts_validator::{Condition, Predicate, SqlCompiler};
///
/// let compiler = SqlCompiler::new(Dialect::Postgres);
/// let predicate = Predicate::new("email_present", Condition::IsNull("email".into()), "null");
///
/// let query = compiler.count_query("public.users", &[&predicate]).unwrap();
/// assert!(query.sql.contains("\"email\" IS NULL"));
/// assert!(query.sql.contains("FROM \"public\".\"users\""));
/// ```
#[derive(Clone, Copy)]
pub struct SqlCompiler {
    dialect: &'static dyn SqlDialect,
}

impl SqlCompiler {
    /// Creates a compiler for a dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect: dialect_for(dialect),
        }
    }

    /// Target dialect.
    pub fn dialect(&self) -> Dialect {
        self.dialect.dialect()
    }

    /// Whether predicates may be batched into one query.
    pub fn supports_batching(&self) -> bool {
        self.dialect.supports_batching()
    }

    /// Quotes a possibly schema-qualified relation name.
    pub fn relation(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.dialect.quote_identifier(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Checks that a predicate has a rendering for this dialect.
    pub fn check(&self, predicate: &Predicate) -> Result<(), CompileError> {
        let keys = DuplicateKeys::collect(&[predicate]);
        self.condition(&predicate.condition, &keys).map(|_| ())
    }

    /// Renders the boolean failure condition of a predicate.
    pub fn render_condition(&self, predicate: &Predicate) -> Result<String, CompileError> {
        let keys = DuplicateKeys::collect(&[predicate]);
        self.condition(&predicate.condition, &keys)
    }

    /// Builds one query returning the total row count followed by one failing
    /// count per predicate.
    pub fn count_query(
        &self,
        relation: &str,
        predicates: &[&Predicate],
    ) -> Result<CountQuery, CompileError> {
        let keys = DuplicateKeys::collect(predicates);
        let mut columns = vec![format!(
            "{} AS {}",
            self.as_integer("COUNT(*)"),
            self.dialect.quote_identifier(TOTAL_ALIAS)
        )];

        for (i, predicate) in predicates.iter().enumerate() {
            let condition = self.condition(&predicate.condition, &keys)?;
            columns.push(format!(
                "{} AS {}",
                self.failing_count(&condition),
                self.dialect.quote_identifier(&format!("__f{}", i))
            ));
        }

        Ok(CountQuery {
            sql: format!(
                "SELECT {} FROM {}",
                columns.join(", "),
                self.source(relation, &keys)
            ),
            rule_ids: predicates.iter().map(|p| p.rule_id.clone()).collect(),
        })
    }

    /// Builds a query returning up to `limit` failing rows, projected to the
    /// predicate's columns and ordered by them.
    pub fn sample_query(
        &self,
        relation: &str,
        predicate: &Predicate,
        limit: usize,
    ) -> Result<String, CompileError> {
        let keys = DuplicateKeys::collect(&[predicate]);
        let condition = self.condition(&predicate.condition, &keys)?;
        let columns = predicate
            .columns
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "SELECT {cols} FROM {source} WHERE COALESCE(({cond}), {no}) ORDER BY {cols} LIMIT {limit}",
            cols = columns,
            source = self.source(relation, &keys),
            cond = condition,
            no = self.dialect.boolean_literal(false),
            limit = limit
        ))
    }

    fn failing_count(&self, condition: &str) -> String {
        self.as_integer(&format!(
            "COALESCE(SUM(CASE WHEN COALESCE(({}), {}) THEN 1 ELSE 0 END), 0)",
            condition,
            self.dialect.boolean_literal(false)
        ))
    }

    fn as_integer(&self, expr: &str) -> String {
        format!("CAST({} AS {})", expr, self.dialect.integer_type())
    }

    fn source(&self, relation: &str, keys: &DuplicateKeys) -> String {
        let relation = self.relation(relation);
        let alias = self.dialect.quote_identifier(SOURCE_ALIAS);
        if keys.is_empty() {
            return format!("{} AS {}", relation, alias);
        }

        let windows = keys
            .iter()
            .enumerate()
            .map(|(i, columns)| {
                format!(
                    "COUNT(*) OVER (PARTITION BY {}) AS {}",
                    self.column_list(columns),
                    self.dialect.quote_identifier(&DuplicateKeys::alias(i))
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!("(SELECT *, {} FROM {}) AS {}", windows, relation, alias)
    }

    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn condition(&self, condition: &Condition, keys: &DuplicateKeys) -> Result<String, CompileError> {
        Ok(match condition {
            Condition::IsNull(column) => {
                format!("{} IS NULL", self.dialect.quote_identifier(column))
            }
            Condition::NotIn { column, values } => {
                if values.is_empty() {
                    return Err(CompileError::EmptyValueList(column.clone()));
                }
                let literals = values
                    .iter()
                    .map(|v| self.literal(v))
                    .collect::<Result<Vec<_>, _>>()?;
                format!(
                    "{} NOT IN ({})",
                    self.dialect.quote_identifier(column),
                    literals.join(", ")
                )
            }
            Condition::Compare { column, op, value } => format!(
                "{} {} {}",
                self.dialect.quote_identifier(column),
                op.as_sql(),
                self.literal(value)?
            ),
            Condition::Matches { column, regex } => self
                .dialect
                .regex_match(&self.dialect.quote_identifier(column), regex.as_str())
                .ok_or(CompileError::RegexUnsupported(self.dialect.dialect()))?,
            Condition::Duplicated { columns } => {
                let mut parts: Vec<String> = columns
                    .iter()
                    .map(|c| format!("{} IS NOT NULL", self.dialect.quote_identifier(c)))
                    .collect();
                parts.push(format!(
                    "{} > 1",
                    self.dialect
                        .quote_identifier(&DuplicateKeys::alias(keys.position(columns)))
                ));
                format!("({})", parts.join(" AND "))
            }
            Condition::Not(inner) => format!("NOT ({})", self.condition(inner, keys)?),
            Condition::And(parts) => self.junction(parts, "AND", true, keys)?,
            Condition::Or(parts) => self.junction(parts, "OR", false, keys)?,
        })
    }

    fn junction(
        &self,
        parts: &[Condition],
        operator: &str,
        empty: bool,
        keys: &DuplicateKeys,
    ) -> Result<String, CompileError> {
        if parts.is_empty() {
            return Ok(self.dialect.boolean_literal(empty).to_string());
        }
        let rendered = parts
            .iter()
            .map(|p| self.condition(p, keys).map(|sql| format!("({})", sql)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rendered.join(&format!(" {} ", operator)))
    }

    fn literal(&self, literal: &Literal) -> Result<String, CompileError> {
        Ok(match literal {
            Literal::Str(s) => self.dialect.quote_string(s),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) if !f.is_finite() => return Err(CompileError::NonFiniteLiteral(*f)),
            Literal::Float(f) => format!("{:?}", f),
            Literal::Bool(b) => self.dialect.boolean_literal(*b).to_string(),
        })
    }
}

impl fmt::Debug for SqlCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlCompiler")
            .field("dialect", &self.dialect())
            .finish()
    }
}

/// Distinct duplicate-detection keys, in order of first use.
struct DuplicateKeys(Vec<Vec<String>>);

impl DuplicateKeys {
    fn collect(predicates: &[&Predicate]) -> Self {
        let mut keys: Vec<Vec<String>> = Vec::new();
        for predicate in predicates {
            Self::visit(&predicate.condition, &mut keys);
        }
        Self(keys)
    }

    fn visit(condition: &Condition, keys: &mut Vec<Vec<String>>) {
        match condition {
            Condition::Duplicated { columns } => {
                if !keys.contains(columns) {
                    keys.push(columns.clone());
                }
            }
            Condition::Not(inner) => Self::visit(inner, keys),
            Condition::And(parts) | Condition::Or(parts) => {
                for part in parts {
                    Self::visit(part, keys);
                }
            }
            _ => {}
        }
    }

    fn alias(position: usize) -> String {
        format!("__dup_{}", position)
    }

    fn position(&self, columns: &[String]) -> usize {
        self.0.iter().position(|k| k == columns).unwrap_or(0)
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &Vec<String>> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::CompareOp;
    use pretty_assertions::assert_eq;
    use regex::Regex;

    fn not_null(id: &str, column: &str) -> Predicate {
        Predicate::new(id, Condition::IsNull(column.into()), "null")
    }

    fn unique(id: &str, columns: &[&str]) -> Predicate {
        Predicate::new(
            id,
            Condition::Duplicated {
                columns: columns.iter().map(|c| c.to_string()).collect(),
            },
            "duplicate",
        )
    }

    #[test]
    fn test_single_count_query() {
        let compiler = SqlCompiler::new(Dialect::Postgres);
        let query = compiler
            .count_query("users", &[&not_null("email_present", "email")])
            .unwrap();

        assert_eq!(
            query.sql,
            "SELECT CAST(COUNT(*) AS BIGINT) AS \"__total\", \
             CAST(COALESCE(SUM(CASE WHEN COALESCE((\"email\" IS NULL), FALSE) THEN 1 ELSE 0 END), 0) AS BIGINT) AS \"__f0\" \
             FROM \"users\" AS \"__src\""
        );
        assert_eq!(query.rule_ids, vec!["email_present"]);
    }

    #[test]
    fn test_batched_query_shares_one_window_per_key() {
        let compiler = SqlCompiler::new(Dialect::Sqlite);
        let a = unique("a", &["user_id"]);
        let b = not_null("b", "email");
        let c = unique("c", &["user_id"]);
        let query = compiler.count_query("users", &[&a, &b, &c]).unwrap();

        assert_eq!(query.sql.matches("OVER (PARTITION BY").count(), 1);
        assert!(query.sql.contains(
            "FROM (SELECT *, COUNT(*) OVER (PARTITION BY \"user_id\") AS \"__dup_0\" FROM \"users\") AS \"__src\""
        ));
        assert!(query.sql.contains("(\"user_id\" IS NOT NULL AND \"__dup_0\" > 1)"));
        assert!(query.sql.contains("COALESCE((\"email\" IS NULL), 0)"));
        assert_eq!(query.rule_ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_allowed_values_rendering_per_dialect() {
        let predicate = Predicate::new(
            "status",
            Condition::Or(vec![
                Condition::IsNull("status".into()),
                Condition::NotIn {
                    column: "status".into(),
                    values: vec![Literal::Str("it's".into()), Literal::Str("a\\b".into())],
                },
            ]),
            "not allowed",
        );

        assert_eq!(
            SqlCompiler::new(Dialect::Postgres)
                .render_condition(&predicate)
                .unwrap(),
            "(\"status\" IS NULL) OR (\"status\" NOT IN ('it''s', 'a\\b'))"
        );
        assert_eq!(
            SqlCompiler::new(Dialect::Mysql)
                .render_condition(&predicate)
                .unwrap(),
            "(`status` IS NULL) OR (`status` NOT IN ('it''s', 'a\\\\b'))"
        );
    }

    #[test]
    fn test_compare_literals() {
        let predicate = Predicate::new(
            "r",
            Condition::Or(vec![
                Condition::Compare {
                    column: "age".into(),
                    op: CompareOp::Lt,
                    value: Literal::Int(0),
                },
                Condition::Compare {
                    column: "score".into(),
                    op: CompareOp::Gt,
                    value: Literal::Float(1.5),
                },
                Condition::Compare {
                    column: "active".into(),
                    op: CompareOp::NotEq,
                    value: Literal::Bool(true),
                },
            ]),
            "out of range",
        );
        assert_eq!(
            SqlCompiler::new(Dialect::Sqlite)
                .render_condition(&predicate)
                .unwrap(),
            "(\"age\" < 0) OR (\"score\" > 1.5) OR (\"active\" <> 1)"
        );
    }

    #[test]
    fn test_capability_gaps() {
        let pattern = Predicate::new(
            "code",
            Condition::Not(Box::new(Condition::Matches {
                column: "code".into(),
                regex: Regex::new("^[A-Z]{3}$").unwrap(),
            })),
            "no match",
        );
        assert_eq!(
            SqlCompiler::new(Dialect::Sqlite).check(&pattern),
            Err(CompileError::RegexUnsupported(Dialect::Sqlite))
        );
        assert_eq!(
            SqlCompiler::new(Dialect::Datafusion)
                .render_condition(&pattern)
                .unwrap(),
            "NOT (\"code\" ~ '^[A-Z]{3}$')"
        );

        let nan = Predicate::new(
            "r",
            Condition::Compare {
                column: "x".into(),
                op: CompareOp::Gt,
                value: Literal::Float(f64::NAN),
            },
            "",
        );
        assert!(matches!(
            SqlCompiler::new(Dialect::Postgres).check(&nan),
            Err(CompileError::NonFiniteLiteral(_))
        ));
    }

    #[test]
    fn test_sample_query() {
        let compiler = SqlCompiler::new(Dialect::Postgres);
        let sql = compiler
            .sample_query("users", &unique("u", &["tenant", "user_id"]), 5)
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"tenant\", \"user_id\" FROM (SELECT *, COUNT(*) OVER (PARTITION BY \"tenant\", \"user_id\") AS \"__dup_0\" FROM \"users\") AS \"__src\" \
             WHERE COALESCE(((\"tenant\" IS NOT NULL AND \"user_id\" IS NOT NULL AND \"__dup_0\" > 1)), FALSE) \
             ORDER BY \"tenant\", \"user_id\" LIMIT 5"
        );
    }

    #[test]
    fn test_mysql_integer_cast() {
        let query = SqlCompiler::new(Dialect::Mysql)
            .count_query("db.users", &[])
            .unwrap();
        assert_eq!(
            query.sql,
            "SELECT CAST(COUNT(*) AS SIGNED) AS `__total` FROM `db`.`users` AS `__src`"
        );
    }
}
