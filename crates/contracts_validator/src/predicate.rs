//! Row-level failure predicates.
//!
//! A [`Predicate`] describes "this row violates rule R" as a [`Condition`]
//! tree. The same tree is interpreted against an in-memory [`Table`] here and
//! rendered to SQL by [`crate::sql::SqlCompiler`], so both paths share one
//! definition of failure.
//!
//! Conditions use three-valued logic. `None` (SQL `NULL`, "unknown") is
//! coalesced to "not failing" when the final verdict is taken, on both paths.

use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::dataset::parse_timestamp_micros;
use crate::{DataValue, Table, ValidationError};

/// A literal operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// String literal
    Str(String),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// Boolean literal
    Bool(bool),
}

impl Literal {
    /// Converts a JSON scalar into a literal.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Literal::Str(s.clone())),
            serde_json::Value::Bool(b) => Some(Literal::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Literal::Int)
                .or_else(|| n.as_f64().map(Literal::Float)),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Literal::Str(_) => "string",
            Literal::Int(_) | Literal::Float(_) => "number",
            Literal::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "'{}'", s),
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
}

impl CompareOp {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
        }
    }
}

/// Boolean expression over the columns of one row.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Column value is null (never unknown)
    IsNull(String),
    /// Column value is not one of the literals; unknown for null
    NotIn { column: String, values: Vec<Literal> },
    /// `column <op> literal`; unknown for null
    Compare {
        column: String,
        op: CompareOp,
        value: Literal,
    },
    /// Column value matches the regex; unknown for null
    Matches { column: String, regex: Regex },
    /// The row's key occurs more than once; false when any key part is null
    Duplicated { columns: Vec<String> },
    /// Negation
    Not(Box<Condition>),
    /// Conjunction
    And(Vec<Condition>),
    /// Disjunction
    Or(Vec<Condition>),
}

impl Condition {
    /// Columns referenced by this condition.
    pub fn columns(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            Condition::IsNull(column)
            | Condition::NotIn { column, .. }
            | Condition::Compare { column, .. }
            | Condition::Matches { column, .. } => {
                out.insert(column.clone());
            }
            Condition::Duplicated { columns } => out.extend(columns.iter().cloned()),
            Condition::Not(inner) => inner.collect_columns(out),
            Condition::And(parts) | Condition::Or(parts) => {
                for part in parts {
                    part.collect_columns(out);
                }
            }
        }
    }

    /// Resolves columns against a table and precomputes duplicate groups.
    fn bind<'a>(&'a self, table: &'a Table) -> Result<Bound<'a>, ValidationError> {
        Ok(match self {
            Condition::IsNull(column) => Bound::IsNull(table.column(column)?),
            Condition::NotIn { column, values } => Bound::NotIn {
                column,
                data: table.column(column)?,
                values,
            },
            Condition::Compare { column, op, value } => Bound::Compare {
                column,
                data: table.column(column)?,
                op: *op,
                value,
            },
            Condition::Matches { column, regex } => Bound::Matches {
                column,
                data: table.column(column)?,
                regex,
            },
            Condition::Duplicated { columns } => Bound::Duplicated(duplicate_flags(table, columns)?),
            Condition::Not(inner) => Bound::Not(Box::new(inner.bind(table)?)),
            Condition::And(parts) => Bound::And(
                parts
                    .iter()
                    .map(|p| p.bind(table))
                    .collect::<Result<_, _>>()?,
            ),
            Condition::Or(parts) => Bound::Or(
                parts
                    .iter()
                    .map(|p| p.bind(table))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

/// Condition with its columns resolved against one table.
enum Bound<'a> {
    IsNull(&'a [DataValue]),
    NotIn {
        column: &'a str,
        data: &'a [DataValue],
        values: &'a [Literal],
    },
    Compare {
        column: &'a str,
        data: &'a [DataValue],
        op: CompareOp,
        value: &'a Literal,
    },
    Matches {
        column: &'a str,
        data: &'a [DataValue],
        regex: &'a Regex,
    },
    Duplicated(Vec<bool>),
    Not(Box<Bound<'a>>),
    And(Vec<Bound<'a>>),
    Or(Vec<Bound<'a>>),
}

impl Bound<'_> {
    fn eval(&self, row: usize) -> Result<Option<bool>, ValidationError> {
        match self {
            Bound::IsNull(data) => Ok(Some(data[row].is_null())),
            Bound::NotIn {
                column,
                data,
                values,
            } => {
                let value = &data[row];
                if value.is_null() {
                    return Ok(None);
                }
                for literal in values.iter() {
                    if compare(column, value, literal)? == Ordering::Equal {
                        return Ok(Some(false));
                    }
                }
                Ok(Some(true))
            }
            Bound::Compare {
                column,
                data,
                op,
                value,
            } => {
                let current = &data[row];
                if current.is_null() {
                    return Ok(None);
                }
                Ok(Some(op.holds(compare(column, current, value)?)))
            }
            Bound::Matches {
                column,
                data,
                regex,
            } => match &data[row] {
                DataValue::Null => Ok(None),
                DataValue::String(s) | DataValue::Timestamp(s) => Ok(Some(regex.is_match(s))),
                other => Err(ValidationError::type_mismatch(
                    *column,
                    "string",
                    other.type_name(),
                )),
            },
            Bound::Duplicated(flags) => Ok(Some(flags[row])),
            Bound::Not(inner) => Ok(inner.eval(row)?.map(|b| !b)),
            Bound::And(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.eval(row)? {
                        Some(false) => return Ok(Some(false)),
                        None => unknown = true,
                        Some(true) => {}
                    }
                }
                Ok(if unknown { None } else { Some(true) })
            }
            Bound::Or(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.eval(row)? {
                        Some(true) => return Ok(Some(true)),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                Ok(if unknown { None } else { Some(false) })
            }
        }
    }
}

/// Orders a column value against a literal of a compatible type.
fn compare(column: &str, value: &DataValue, literal: &Literal) -> Result<Ordering, ValidationError> {
    let ordering = match (value, literal) {
        (DataValue::Int(a), Literal::Int(b)) => Some(a.cmp(b)),
        (DataValue::Int(_) | DataValue::Float(_), Literal::Int(_) | Literal::Float(_)) => {
            let a = value.as_float().unwrap_or(f64::NAN);
            let b = match literal {
                Literal::Int(i) => *i as f64,
                Literal::Float(f) => *f,
                _ => f64::NAN,
            };
            a.partial_cmp(&b)
        }
        (DataValue::Timestamp(a), Literal::Str(b)) => {
            let instant = parse_timestamp_micros(b).ok_or_else(|| {
                ValidationError::type_mismatch(column, "timestamp", "unparseable string literal")
            })?;
            let current = parse_timestamp_micros(a).ok_or_else(|| {
                ValidationError::evaluation(format!(
                    "column '{}' holds an unparseable timestamp '{}'",
                    column, a
                ))
            })?;
            Some(current.cmp(&instant))
        }
        (DataValue::String(a), Literal::Str(b)) => Some(a.as_str().cmp(b)),
        (DataValue::Bool(a), Literal::Bool(b)) => Some(a.cmp(b)),
        _ => {
            return Err(ValidationError::type_mismatch(
                column,
                literal.type_name(),
                value.type_name(),
            ));
        }
    };
    ordering.ok_or_else(|| {
        ValidationError::evaluation(format!("column '{}' holds a NaN value", column))
    })
}

/// Per-row flags: true when the row's non-null key occurs more than once.
fn duplicate_flags(table: &Table, columns: &[String]) -> Result<Vec<bool>, ValidationError> {
    let data = columns
        .iter()
        .map(|c| table.column(c))
        .collect::<Result<Vec<_>, _>>()?;

    let keys: Vec<Option<Vec<String>>> = (0..table.num_rows())
        .map(|row| {
            data.iter()
                .map(|column| column[row].group_key())
                .collect::<Option<Vec<_>>>()
        })
        .collect();

    let mut counts: HashMap<&[String], usize> = HashMap::new();
    for key in keys.iter().flatten() {
        *counts.entry(key.as_slice()).or_default() += 1;
    }

    Ok(keys
        .iter()
        .map(|key| match key {
            Some(k) => counts.get(k.as_slice()).copied().unwrap_or(0) > 1,
            None => false,
        })
        .collect())
}

/// A compiled, portable "row violates rule" condition.
#[derive(Debug, Clone)]
pub struct Predicate {
    /// Owning rule identifier
    pub rule_id: String,
    /// Failure condition
    pub condition: Condition,
    /// Description of a failing row, e.g. "row(s) with null 'email'"
    pub message: String,
    /// Columns read by the condition, sorted
    pub columns: Vec<String>,
}

impl Predicate {
    /// Creates a predicate; the column set is derived from the condition.
    pub fn new(
        rule_id: impl Into<String>,
        condition: Condition,
        message: impl Into<String>,
    ) -> Self {
        let columns = condition.columns().into_iter().collect();
        Self {
            rule_id: rule_id.into(),
            condition,
            message: message.into(),
            columns,
        }
    }

    /// Positions of failing rows, in ascending order.
    pub fn failing_rows(&self, table: &Table) -> Result<Vec<usize>, ValidationError> {
        let bound = self.condition.bind(table)?;
        let mut failing = Vec::new();
        for row in 0..table.num_rows() {
            if bound.eval(row)?.unwrap_or(false) {
                failing.push(row);
            }
        }
        Ok(failing)
    }

    /// Result message for a failing-row count.
    pub fn describe(&self, failing_count: u64) -> String {
        format!("{} {}", failing_count, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> Table {
        Table::from_columns(vec![
            (
                "id",
                vec![
                    DataValue::Int(1),
                    DataValue::Int(2),
                    DataValue::Int(2),
                    DataValue::Int(3),
                    DataValue::Null,
                    DataValue::Null,
                ],
            ),
            (
                "status",
                vec![
                    DataValue::from("active"),
                    DataValue::from("inactive"),
                    DataValue::Null,
                    DataValue::from("deleted"),
                    DataValue::from("active"),
                    DataValue::from("bogus"),
                ],
            ),
            (
                "age",
                vec![
                    DataValue::Int(30),
                    DataValue::Int(-1),
                    DataValue::Float(200.5),
                    DataValue::Null,
                    DataValue::Int(0),
                    DataValue::Int(150),
                ],
            ),
        ])
        .unwrap()
    }

    fn failing(condition: Condition) -> Vec<usize> {
        Predicate::new("r", condition, "row(s)")
            .failing_rows(&table())
            .unwrap()
    }

    fn allowed() -> Vec<Literal> {
        vec![
            Literal::Str("active".into()),
            Literal::Str("inactive".into()),
        ]
    }

    #[test]
    fn test_is_null() {
        assert_eq!(failing(Condition::IsNull("id".into())), vec![4, 5]);
    }

    #[test]
    fn test_not_in_treats_null_as_unknown() {
        let condition = Condition::NotIn {
            column: "status".into(),
            values: allowed(),
        };
        assert_eq!(failing(condition), vec![3, 5]);
    }

    #[test]
    fn test_null_or_not_in() {
        let condition = Condition::Or(vec![
            Condition::IsNull("status".into()),
            Condition::NotIn {
                column: "status".into(),
                values: allowed(),
            },
        ]);
        assert_eq!(failing(condition), vec![2, 3, 5]);
    }

    #[test]
    fn test_range_violation() {
        let condition = Condition::Or(vec![
            Condition::Compare {
                column: "age".into(),
                op: CompareOp::Lt,
                value: Literal::Int(0),
            },
            Condition::Compare {
                column: "age".into(),
                op: CompareOp::Gt,
                value: Literal::Int(150),
            },
        ]);
        assert_eq!(failing(condition), vec![1, 2]);
    }

    #[test]
    fn test_duplicates_count_every_member_and_skip_nulls() {
        let condition = Condition::Duplicated {
            columns: vec!["id".into()],
        };
        assert_eq!(failing(condition), vec![1, 2]);

        let composite = Condition::Duplicated {
            columns: vec!["id".into(), "status".into()],
        };
        assert_eq!(failing(composite), Vec::<usize>::new());
    }

    #[test]
    fn test_not_matches() {
        let condition = Condition::Not(Box::new(Condition::Matches {
            column: "status".into(),
            regex: Regex::new("^(in)?active$").unwrap(),
        }));
        assert_eq!(failing(condition), vec![3, 5]);
    }

    #[test]
    fn test_kleene_and() {
        // unknown AND false = false, unknown AND true = unknown
        let condition = Condition::And(vec![
            Condition::Compare {
                column: "age".into(),
                op: CompareOp::GtEq,
                value: Literal::Int(0),
            },
            Condition::Not(Box::new(Condition::IsNull("id".into()))),
        ]);
        assert_eq!(failing(condition), vec![0, 2]);
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let predicate = Predicate::new(
            "r",
            Condition::Compare {
                column: "status".into(),
                op: CompareOp::Lt,
                value: Literal::Int(3),
            },
            "row(s)",
        );
        assert!(matches!(
            predicate.failing_rows(&table()),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_timestamps_compare_as_instants() {
        let table = Table::from_columns(vec![(
            "ts",
            vec![
                DataValue::Timestamp("2024-01-01T00:00:00+00:00".into()),
                DataValue::Timestamp("2024-01-01T01:30:00+02:00".into()),
                DataValue::Timestamp("2024-03-01T00:00:00+00:00".into()),
            ],
        )])
        .unwrap();
        let before = |value: &str| {
            Predicate::new(
                "r",
                Condition::Compare {
                    column: "ts".into(),
                    op: CompareOp::Lt,
                    value: Literal::Str(value.into()),
                },
                "row(s)",
            )
            .failing_rows(&table)
        };

        assert_eq!(before("2024-01-01T00:00:00Z").unwrap(), vec![1]);
        assert_eq!(before("2024-02-01").unwrap(), vec![0, 1]);
        assert_eq!(before("2024-01-01 00:00:00").unwrap(), vec![1]);
        assert!(matches!(
            before("last tuesday"),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let predicate = Predicate::new("r", Condition::IsNull("email".into()), "row(s)");
        assert!(matches!(
            predicate.failing_rows(&table()),
            Err(ValidationError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_columns_are_sorted_and_deduplicated() {
        let predicate = Predicate::new(
            "r",
            Condition::Or(vec![
                Condition::IsNull("status".into()),
                Condition::Duplicated {
                    columns: vec!["status".into(), "id".into()],
                },
            ]),
            "row(s)",
        );
        assert_eq!(predicate.columns, vec!["id", "status"]);
        assert_eq!(predicate.describe(3), "3 row(s)");
    }

    #[test]
    fn test_literal_from_json() {
        assert_eq!(Literal::from_json(&serde_json::json!(5)), Some(Literal::Int(5)));
        assert_eq!(Literal::from_json(&serde_json::json!(2.5)), Some(Literal::Float(2.5)));
        assert_eq!(
            Literal::from_json(&serde_json::json!("x")),
            Some(Literal::Str("x".into()))
        );
        assert_eq!(Literal::from_json(&serde_json::json!([1])), None);
    }
}
