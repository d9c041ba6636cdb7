//! Tabular data representation for validation.
//!
//! A [`Table`] wraps an Arrow [`RecordBatch`] and exposes its columns as
//! [`DataValue`] slices. Columns are converted once, when the table is built;
//! a column whose Arrow type has no value mapping only fails the rules that
//! read it.

use arrow_array::{
    Array, ArrayRef, BooleanArray, Date32Array, Date64Array, Decimal128Array, Float32Array,
    Float64Array, Int8Array, Int16Array, Int32Array, Int64Array, LargeStringArray, RecordBatch,
    RecordBatchOptions, StringArray, StringViewArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray, UInt8Array,
    UInt16Array, UInt32Array, UInt64Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use datafusion::arrow::compute::concat_batches;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ValidationError;

/// A value in a dataset.
///
/// Represents different types of values that can appear in data records.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Null/missing value
    Null,
    /// String value
    String(String),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Timestamp or date value (ISO 8601 string)
    Timestamp(String),
}

impl DataValue {
    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            DataValue::Null => "null",
            DataValue::String(_) => "string",
            DataValue::Int(_) => "int64",
            DataValue::Float(_) => "float64",
            DataValue::Bool(_) => "boolean",
            DataValue::Timestamp(_) => "timestamp",
        }
    }

    /// Attempts to get this value as a string.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to get this value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            DataValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to get this value as a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            DataValue::Float(f) => Some(*f),
            DataValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Attempts to get this value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to get this value as a timestamp string.
    pub fn as_timestamp(&self) -> Option<&str> {
        match self {
            DataValue::Timestamp(s) => Some(s),
            _ => None,
        }
    }

    /// JSON rendering used in failure samples.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            DataValue::Null => serde_json::Value::Null,
            DataValue::String(s) | DataValue::Timestamp(s) => serde_json::Value::String(s.clone()),
            DataValue::Int(i) => serde_json::Value::from(*i),
            DataValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            DataValue::Bool(b) => serde_json::Value::Bool(*b),
        }
    }

    /// Hashable key with type tag, used for equality grouping.
    ///
    /// Integers and integral floats share a key so `1` and `1.0` group together.
    pub(crate) fn group_key(&self) -> Option<String> {
        match self {
            DataValue::Null => None,
            DataValue::String(s) => Some(format!("s:{}", s)),
            DataValue::Timestamp(s) => Some(format!("t:{}", s)),
            DataValue::Int(i) => Some(format!("n:{}", i)),
            DataValue::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Some(format!("n:{}", *f as i64))
            }
            DataValue::Float(f) => Some(format!("f:{}", f)),
            DataValue::Bool(b) => Some(format!("b:{}", b)),
        }
    }
}

impl fmt::Display for DataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataValue::Null => f.write_str("null"),
            DataValue::String(s) | DataValue::Timestamp(s) => write!(f, "'{}'", s),
            DataValue::Int(i) => write!(f, "{}", i),
            DataValue::Float(v) => write!(f, "{}", v),
            DataValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::String(s)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::String(s.to_string())
    }
}

impl From<i64> for DataValue {
    fn from(i: i64) -> Self {
        DataValue::Int(i)
    }
}

impl From<i32> for DataValue {
    fn from(i: i32) -> Self {
        DataValue::Int(i as i64)
    }
}

impl From<f64> for DataValue {
    fn from(f: f64) -> Self {
        DataValue::Float(f)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Bool(b)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(DataValue::Null)
    }
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    values: Result<Vec<DataValue>, ValidationError>,
}

/// An in-memory columnar table.
///
/// # Example
///
/// ```rust
/// use contracts_validator::{DataValue, Table};
///
/// let table = Table::from_columns(vec![
///     ("id", vec![DataValue::Int(1), DataValue::Int(2)]),
///     ("email", vec![DataValue::from("a@x.io"), DataValue::Null]),
/// ])
/// .unwrap();
///
/// assert_eq!(table.num_rows(), 2);
/// assert!(table.column("email").unwrap()[1].is_null());
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    batch: RecordBatch,
    columns: Vec<Column>,
}

impl Table {
    /// Wraps a record batch, converting every column to values.
    pub fn from_batch(batch: RecordBatch) -> Self {
        let schema = batch.schema();
        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| Column {
                name: field.name().clone(),
                values: column_values(field.name(), array),
            })
            .collect();
        Self { batch, columns }
    }

    /// Concatenates record batches sharing `schema` into one table.
    pub fn from_batches(schema: SchemaRef, batches: &[RecordBatch]) -> Result<Self, ValidationError> {
        let batch = match batches {
            [] => RecordBatch::new_empty(schema),
            [only] => only.clone(),
            _ => concat_batches(&schema, batches)
                .map_err(|e| ValidationError::evaluation(e.to_string()))?,
        };
        Ok(Self::from_batch(batch))
    }

    /// Creates a table with no columns and `rows` rows.
    pub fn with_row_count(rows: usize) -> Result<Self, ValidationError> {
        let batch = RecordBatch::try_new_with_options(
            Arc::new(Schema::empty()),
            Vec::new(),
            &RecordBatchOptions::new().with_row_count(Some(rows)),
        )
        .map_err(|e| ValidationError::evaluation(e.to_string()))?;
        Ok(Self::from_batch(batch))
    }

    /// Builds a table from named value columns.
    ///
    /// Arrow types are inferred per column; integers mixed with floats widen
    /// to float, an all-null column becomes a nullable string column.
    pub fn from_columns<N, I>(columns: I) -> Result<Self, ValidationError>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Vec<DataValue>)>,
    {
        let mut fields = Vec::new();
        let mut arrays = Vec::new();
        let mut rows: Option<usize> = None;

        for (name, values) in columns {
            let name = name.into();
            match rows {
                Some(n) if n != values.len() => {
                    return Err(ValidationError::evaluation(format!(
                        "column '{}' has {} values, expected {}",
                        name,
                        values.len(),
                        n
                    )));
                }
                _ => rows = Some(values.len()),
            }
            let array = build_array(&name, &values)?;
            fields.push(Field::new(name, array.data_type().clone(), true));
            arrays.push(array);
        }

        if arrays.is_empty() {
            return Self::with_row_count(0);
        }

        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
            .map_err(|e| ValidationError::evaluation(e.to_string()))?;
        Ok(Self::from_batch(batch))
    }

    /// Builds a table from row-major values.
    pub fn from_rows(names: &[String], rows: Vec<Vec<DataValue>>) -> Result<Self, ValidationError> {
        if names.is_empty() {
            return Self::with_row_count(rows.len());
        }

        let mut columns: Vec<Vec<DataValue>> = vec![Vec::with_capacity(rows.len()); names.len()];
        for (position, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(ValidationError::evaluation(format!(
                    "row {} has {} values, expected {}",
                    position,
                    row.len(),
                    names.len()
                )));
            }
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }

        Self::from_columns(names.iter().cloned().zip(columns))
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Column names, in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns true if the table has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of a column.
    pub fn column(&self, name: &str) -> Result<&[DataValue], ValidationError> {
        let column = self
            .columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ValidationError::missing_column(name))?;
        match &column.values {
            Ok(values) => Ok(values),
            Err(e) => Err(e.clone()),
        }
    }

    /// Keeps only the named columns, in the given order.
    pub fn project(&self, names: &[String]) -> Result<Self, ValidationError> {
        if names.is_empty() {
            return Self::with_row_count(self.num_rows());
        }
        let schema = self.batch.schema();
        let indices = names
            .iter()
            .map(|name| {
                schema
                    .index_of(name)
                    .map_err(|_| ValidationError::missing_column(name))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let batch = self
            .batch
            .project(&indices)
            .map_err(|e| ValidationError::evaluation(e.to_string()))?;
        Ok(Self::from_batch(batch))
    }

    /// The underlying record batch.
    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Approximate in-memory size of the table in bytes.
    pub fn memory_size(&self) -> usize {
        self.batch.get_array_memory_size()
    }

    /// JSON values of the given columns at one row.
    pub fn row_values(
        &self,
        row: usize,
        columns: &[String],
    ) -> Result<BTreeMap<String, serde_json::Value>, ValidationError> {
        columns
            .iter()
            .map(|name| {
                let value = self
                    .column(name)?
                    .get(row)
                    .map(DataValue::to_json)
                    .unwrap_or(serde_json::Value::Null);
                Ok((name.clone(), value))
            })
            .collect()
    }
}

/// Converts an Arrow array into values.
pub fn column_values(name: &str, array: &ArrayRef) -> Result<Vec<DataValue>, ValidationError> {
    match array.data_type() {
        DataType::Null => Ok(vec![DataValue::Null; array.len()]),
        DataType::Boolean => collect::<BooleanArray>(name, array, |a, i| Ok(DataValue::Bool(a.value(i)))),
        DataType::Int8 => collect::<Int8Array>(name, array, |a, i| Ok(DataValue::Int(a.value(i) as i64))),
        DataType::Int16 => collect::<Int16Array>(name, array, |a, i| Ok(DataValue::Int(a.value(i) as i64))),
        DataType::Int32 => collect::<Int32Array>(name, array, |a, i| Ok(DataValue::Int(a.value(i) as i64))),
        DataType::Int64 => collect::<Int64Array>(name, array, |a, i| Ok(DataValue::Int(a.value(i)))),
        DataType::UInt8 => collect::<UInt8Array>(name, array, |a, i| Ok(DataValue::Int(a.value(i) as i64))),
        DataType::UInt16 => collect::<UInt16Array>(name, array, |a, i| Ok(DataValue::Int(a.value(i) as i64))),
        DataType::UInt32 => collect::<UInt32Array>(name, array, |a, i| Ok(DataValue::Int(a.value(i) as i64))),
        DataType::UInt64 => collect::<UInt64Array>(name, array, |a, i| {
            let value = a.value(i);
            Ok(i64::try_from(value)
                .map(DataValue::Int)
                .unwrap_or(DataValue::Float(value as f64)))
        }),
        DataType::Float32 => collect::<Float32Array>(name, array, |a, i| Ok(DataValue::Float(a.value(i) as f64))),
        DataType::Float64 => collect::<Float64Array>(name, array, |a, i| Ok(DataValue::Float(a.value(i)))),
        DataType::Decimal128(_, scale) => {
            let divisor = 10f64.powi(*scale as i32);
            collect::<Decimal128Array>(name, array, |a, i| {
                Ok(DataValue::Float(a.value(i) as f64 / divisor))
            })
        }
        DataType::Utf8 => collect::<StringArray>(name, array, |a, i| Ok(DataValue::String(a.value(i).to_string()))),
        DataType::LargeUtf8 => collect::<LargeStringArray>(name, array, |a, i| {
            Ok(DataValue::String(a.value(i).to_string()))
        }),
        DataType::Utf8View => collect::<StringViewArray>(name, array, |a, i| {
            Ok(DataValue::String(a.value(i).to_string()))
        }),
        DataType::Date32 => collect::<Date32Array>(name, array, |a, i| {
            NaiveDate::from_num_days_from_ce_opt(UNIX_EPOCH_DAYS_FROM_CE + a.value(i))
                .map(|d| DataValue::Timestamp(d.to_string()))
                .ok_or_else(|| invalid_temporal(name))
        }),
        DataType::Date64 => collect::<Date64Array>(name, array, |a, i| {
            DateTime::from_timestamp_millis(a.value(i))
                .map(|d| DataValue::Timestamp(d.date_naive().to_string()))
                .ok_or_else(|| invalid_temporal(name))
        }),
        DataType::Timestamp(unit, _) => match unit {
            TimeUnit::Second => collect::<TimestampSecondArray>(name, array, |a, i| {
                timestamp(name, DateTime::from_timestamp(a.value(i), 0))
            }),
            TimeUnit::Millisecond => collect::<TimestampMillisecondArray>(name, array, |a, i| {
                timestamp(name, DateTime::from_timestamp_millis(a.value(i)))
            }),
            TimeUnit::Microsecond => collect::<TimestampMicrosecondArray>(name, array, |a, i| {
                timestamp(name, DateTime::from_timestamp_micros(a.value(i)))
            }),
            TimeUnit::Nanosecond => collect::<TimestampNanosecondArray>(name, array, |a, i| {
                timestamp(name, Some(DateTime::from_timestamp_nanos(a.value(i))))
            }),
        },
        other => Err(ValidationError::unsupported_type(name, other.to_string())),
    }
}

/// Days between 0001-01-01 and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn collect<T>(
    name: &str,
    array: &ArrayRef,
    value: impl Fn(&T, usize) -> Result<DataValue, ValidationError>,
) -> Result<Vec<DataValue>, ValidationError>
where
    T: Array + 'static,
{
    let typed = array.as_any().downcast_ref::<T>().ok_or_else(|| {
        ValidationError::unsupported_type(name, array.data_type().to_string())
    })?;
    (0..typed.len())
        .map(|i| {
            if typed.is_null(i) {
                Ok(DataValue::Null)
            } else {
                value(typed, i)
            }
        })
        .collect()
}

fn timestamp(name: &str, value: Option<DateTime<Utc>>) -> Result<DataValue, ValidationError> {
    value
        .map(|ts| DataValue::Timestamp(ts.to_rfc3339()))
        .ok_or_else(|| invalid_temporal(name))
}

fn invalid_temporal(name: &str) -> ValidationError {
    ValidationError::evaluation(format!("column '{}' holds an out-of-range date", name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    String,
    Int,
    Float,
    Bool,
    Timestamp,
}

fn build_array(name: &str, values: &[DataValue]) -> Result<ArrayRef, ValidationError> {
    let mut kind: Option<ValueKind> = None;
    for value in values {
        let this = match value {
            DataValue::Null => continue,
            DataValue::String(_) => ValueKind::String,
            DataValue::Int(_) => ValueKind::Int,
            DataValue::Float(_) => ValueKind::Float,
            DataValue::Bool(_) => ValueKind::Bool,
            DataValue::Timestamp(_) => ValueKind::Timestamp,
        };
        kind = match (kind, this) {
            (None, k) => Some(k),
            (Some(a), b) if a == b => Some(a),
            (Some(ValueKind::Int), ValueKind::Float) | (Some(ValueKind::Float), ValueKind::Int) => {
                Some(ValueKind::Float)
            }
            (Some(a), _) => {
                return Err(ValidationError::type_mismatch(
                    name,
                    format!("{:?}", a).to_lowercase(),
                    value.type_name(),
                ));
            }
        };
    }

    let array: ArrayRef = match kind {
        None | Some(ValueKind::String) => Arc::new(StringArray::from(
            values.iter().map(DataValue::as_string).collect::<Vec<_>>(),
        )),
        Some(ValueKind::Int) => Arc::new(Int64Array::from(
            values.iter().map(DataValue::as_int).collect::<Vec<_>>(),
        )),
        Some(ValueKind::Float) => Arc::new(Float64Array::from(
            values.iter().map(DataValue::as_float).collect::<Vec<_>>(),
        )),
        Some(ValueKind::Bool) => Arc::new(BooleanArray::from(
            values.iter().map(DataValue::as_bool).collect::<Vec<_>>(),
        )),
        Some(ValueKind::Timestamp) => {
            let micros = values
                .iter()
                .map(|v| match v.as_timestamp() {
                    None => Ok(None),
                    Some(s) => parse_timestamp_micros(s)
                        .map(Some)
                        .ok_or_else(|| ValidationError::type_mismatch(name, "timestamp", s)),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(TimestampMicrosecondArray::from(micros).with_timezone("UTC"))
        }
    };
    Ok(array)
}

/// Microseconds since the epoch for an RFC 3339 instant, a naive date-time
/// (taken as UTC) or a bare date.
pub(crate) fn parse_timestamp_micros(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.timestamp_micros());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|dt| dt.and_utc().timestamp_micros())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_data_value_types() {
        assert_eq!(DataValue::Null.type_name(), "null");
        assert_eq!(DataValue::String("test".into()).type_name(), "string");
        assert_eq!(DataValue::Int(42).type_name(), "int64");
        assert_eq!(DataValue::Float(3.5).type_name(), "float64");
        assert_eq!(DataValue::Bool(true).type_name(), "boolean");
    }

    #[test]
    fn test_data_value_conversions() {
        let val = DataValue::String("hello".into());
        assert_eq!(val.as_string(), Some("hello"));
        assert_eq!(val.as_int(), None);

        let val = DataValue::Int(42);
        assert_eq!(val.as_int(), Some(42));
        assert_eq!(val.as_float(), Some(42.0));
        assert_eq!(val.as_string(), None);

        assert_eq!(DataValue::from(None::<i64>), DataValue::Null);
        assert_eq!(DataValue::from(Some("x")), DataValue::String("x".into()));
    }

    #[test]
    fn test_group_key_merges_integral_floats() {
        assert_eq!(DataValue::Int(1).group_key(), DataValue::Float(1.0).group_key());
        assert_ne!(DataValue::Int(1).group_key(), DataValue::from("1").group_key());
        assert_eq!(DataValue::Null.group_key(), None);
    }

    #[test]
    fn test_table_from_columns_round_trips_values() {
        let table = Table::from_columns(vec![
            ("id", vec![DataValue::Int(1), DataValue::Int(2), DataValue::Null]),
            ("score", vec![DataValue::Int(1), DataValue::Float(2.5), DataValue::Null]),
            ("name", vec![DataValue::from("a"), DataValue::Null, DataValue::from("c")]),
            ("flag", vec![DataValue::Bool(true), DataValue::Bool(false), DataValue::Null]),
        ])
        .unwrap();

        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.column_names(), vec!["id", "score", "name", "flag"]);
        assert_eq!(
            table.column("id").unwrap(),
            &[DataValue::Int(1), DataValue::Int(2), DataValue::Null]
        );
        assert_eq!(
            table.column("score").unwrap(),
            &[DataValue::Float(1.0), DataValue::Float(2.5), DataValue::Null]
        );
        assert_eq!(table.column("name").unwrap()[1], DataValue::Null);
        assert_eq!(table.column("flag").unwrap()[0], DataValue::Bool(true));
    }

    #[test]
    fn test_table_rejects_mixed_types() {
        let err = Table::from_columns(vec![(
            "mixed",
            vec![DataValue::Int(1), DataValue::from("one")],
        )])
        .unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_missing_column() {
        let table = Table::from_columns(vec![("id", vec![DataValue::Int(1)])]).unwrap();
        assert!(matches!(
            table.column("email"),
            Err(ValidationError::MissingColumn(c)) if c == "email"
        ));
    }

    #[test]
    fn test_zero_column_table_keeps_row_count() {
        let table = Table::with_row_count(150).unwrap();
        assert_eq!(table.num_rows(), 150);
        assert!(table.column_names().is_empty());

        let source = Table::from_columns(vec![("id", vec![DataValue::Int(1); 7])]).unwrap();
        assert_eq!(source.project(&[]).unwrap().num_rows(), 7);
    }

    #[test]
    fn test_from_rows_and_project() {
        let names = vec!["id".to_string(), "email".to_string()];
        let table = Table::from_rows(
            &names,
            vec![
                vec![DataValue::Int(1), DataValue::from("a@x.io")],
                vec![DataValue::Int(2), DataValue::Null],
            ],
        )
        .unwrap();

        let projected = table.project(&["email".to_string()]).unwrap();
        assert_eq!(projected.column_names(), vec!["email"]);
        assert_eq!(projected.num_rows(), 2);
        assert!(projected.project(&["id".to_string()]).is_err());
    }

    #[test]
    fn test_timestamps_and_dates() {
        let table = Table::from_columns(vec![(
            "ts",
            vec![
                DataValue::Timestamp("2024-01-15T10:30:00+00:00".into()),
                DataValue::Timestamp("2024-02-01".into()),
            ],
        )])
        .unwrap();

        let values = table.column("ts").unwrap();
        assert_eq!(values[0], DataValue::Timestamp("2024-01-15T10:30:00+00:00".into()));
        assert_eq!(values[1], DataValue::Timestamp("2024-02-01T00:00:00+00:00".into()));

        let dates: ArrayRef = Arc::new(Date32Array::from(vec![Some(19_737), None]));
        let converted = column_values("d", &dates).unwrap();
        assert_eq!(converted[0], DataValue::Timestamp("2024-01-15".into()));
        assert_eq!(converted[1], DataValue::Null);
    }

    #[test]
    fn test_unsupported_type_is_isolated_to_column() {
        use arrow_array::BinaryArray;

        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("blob", DataType::Binary, true),
        ]);
        let batch = RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(BinaryArray::from(vec![b"x".as_ref()])),
            ],
        )
        .unwrap();

        let table = Table::from_batch(batch);
        assert!(table.column("id").is_ok());
        assert!(matches!(
            table.column("blob"),
            Err(ValidationError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_row_values() {
        let table = Table::from_columns(vec![
            ("id", vec![DataValue::Int(7)]),
            ("email", vec![DataValue::Null]),
        ])
        .unwrap();
        let row = table
            .row_values(0, &["email".to_string(), "id".to_string()])
            .unwrap();
        assert_eq!(row["id"], serde_json::json!(7));
        assert_eq!(row["email"], serde_json::Value::Null);
    }
}
