//! Row set types shared by every table store backend.
//!
//! A [`RowSet`] is a rectangular table: ordered column definitions plus rows of
//! [`Value`]s in the same order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
}

impl ColumnKind {
    /// Returns the SQL type name used when creating the column.
    pub fn sql_type(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }

    /// Maps a declared SQL type back to a column kind, using SQLite affinity rules.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_uppercase();
        if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Text
        }
    }
}

/// Metadata about a column in a row set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Exact stored column name.
    pub name: String,

    /// Column storage type.
    pub kind: ColumnKind,
}

impl ColumnDef {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A single cell value read from or written to a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Signed integer.
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text value.
    Text(String),
}

impl Value {
    /// Returns the value as a string slice when it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets the value as an integer. Whole floats and numeric text convert.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interprets the value as a number. Text that does not parse and NaN are `None`.
    pub fn as_f64(&self) -> Option<f64> {
        let number = match self {
            Value::Null => None,
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
        };
        number.filter(|n| n.is_finite())
    }

    /// Equality used by filters: integers and whole floats compare numerically.
    pub fn matches(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Null, _) | (_, Value::Null) => false,
            _ => self == other,
        }
    }

    /// Total order used for sorting distinct values: nulls, then numbers, then text.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Null => 0,
                Value::Int(_) | Value::Float(_) => 1,
                Value::Text(_) => 2,
            }
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) if rank(a) == 1 && rank(b) == 1 => {
                let x = a.as_f64().unwrap_or(f64::NAN);
                let y = b.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }

    /// Converts the value to a display string.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Value::Float(v)
        } else {
            Value::Null
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// An equality filter on one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub value: Value,
}

impl Predicate {
    /// Creates a `column = value` predicate.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}

/// A materialized table: column definitions plus rows in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Creates an empty row set with the given columns.
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Returns the position of the column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the row set has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the rows that satisfy every predicate, in their original order.
    ///
    /// A predicate on a column the row set does not have matches nothing.
    pub fn filtered(&self, predicates: &[Predicate]) -> Self {
        let resolved: Option<Vec<(usize, &Value)>> = predicates
            .iter()
            .map(|p| self.column_index(&p.column).map(|i| (i, &p.value)))
            .collect();

        let rows = match resolved {
            Some(filters) => self
                .rows
                .iter()
                .filter(|row| filters.iter().all(|(i, v)| row[*i].matches(v)))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Converts each row into a JSON object keyed by column name.
    pub fn to_json_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(col, value)| {
                        let json = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
                        (col.name.clone(), json)
                    })
                    .collect()
            })
            .collect()
    }
}
