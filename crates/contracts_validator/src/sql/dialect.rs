//! Per-dialect quoting, escaping and operator spelling.

use contracts_core::Dialect;

/// Syntax rules of one SQL engine.
///
/// Everything that varies between engines lives here so the compiler never
/// formats identifiers or literals itself.
pub trait SqlDialect: Send + Sync {
    /// Dialect tag.
    fn dialect(&self) -> Dialect;

    /// Quotes an identifier, doubling embedded quote characters.
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Quotes a string literal, doubling embedded single quotes.
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Boolean literal spelling.
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "TRUE" } else { "FALSE" }
    }

    /// `expr` matches `pattern`, or `None` if the dialect has no regex operator.
    fn regex_match(&self, expr: &str, pattern: &str) -> Option<String>;

    /// Target type for casting counts to a 64-bit integer.
    fn integer_type(&self) -> &'static str {
        "BIGINT"
    }

    /// Whether several count expressions may share one query.
    fn supports_batching(&self) -> bool {
        true
    }
}

/// PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn regex_match(&self, expr: &str, pattern: &str) -> Option<String> {
        Some(format!("{} ~ {}", expr, self.quote_string(pattern)))
    }
}

/// MySQL / MariaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SqlDialect for MySqlDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Mysql
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    // Backslash is an escape character in MySQL string literals by default.
    fn quote_string(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn regex_match(&self, expr: &str, pattern: &str) -> Option<String> {
        Some(format!("{} REGEXP {}", expr, self.quote_string(pattern)))
    }

    fn integer_type(&self) -> &'static str {
        "SIGNED"
    }
}

/// SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value { "1" } else { "0" }
    }

    // REGEXP is only available when the application registers a function.
    fn regex_match(&self, _expr: &str, _pattern: &str) -> Option<String> {
        None
    }
}

/// Apache DataFusion.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataFusionDialect;

impl SqlDialect for DataFusionDialect {
    fn dialect(&self) -> Dialect {
        Dialect::Datafusion
    }

    fn regex_match(&self, expr: &str, pattern: &str) -> Option<String> {
        Some(format!("{} ~ {}", expr, self.quote_string(pattern)))
    }
}

/// Returns the syntax rules for a dialect.
pub fn dialect_for(dialect: Dialect) -> &'static dyn SqlDialect {
    match dialect {
        Dialect::Postgres => &PostgresDialect,
        Dialect::Mysql => &MySqlDialect,
        Dialect::Sqlite => &SqliteDialect,
        Dialect::Datafusion => &DataFusionDialect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(PostgresDialect.quote_identifier("user\"id"), "\"user\"\"id\"");
        assert_eq!(MySqlDialect.quote_identifier("user`id"), "`user``id`");
        assert_eq!(SqliteDialect.quote_identifier("email"), "\"email\"");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(PostgresDialect.quote_string("O'Brien"), "'O''Brien'");
        assert_eq!(PostgresDialect.quote_string("a\\b"), "'a\\b'");
        assert_eq!(MySqlDialect.quote_string("a\\b'c"), "'a\\\\b''c'");
    }

    #[test]
    fn test_boolean_literals() {
        assert_eq!(PostgresDialect.boolean_literal(false), "FALSE");
        assert_eq!(SqliteDialect.boolean_literal(false), "0");
        assert_eq!(SqliteDialect.boolean_literal(true), "1");
    }

    #[test]
    fn test_regex_capability() {
        assert_eq!(
            PostgresDialect.regex_match("\"code\"", "^[A-Z]+$").unwrap(),
            "\"code\" ~ '^[A-Z]+$'"
        );
        assert_eq!(
            MySqlDialect.regex_match("`code`", "^a").unwrap(),
            "`code` REGEXP '^a'"
        );
        assert!(SqliteDialect.regex_match("\"code\"", "^a").is_none());
    }

    #[test]
    fn test_dialect_for_round_trips_tag() {
        for dialect in Dialect::ALL {
            assert_eq!(dialect_for(dialect).dialect(), dialect);
        }
    }
}
