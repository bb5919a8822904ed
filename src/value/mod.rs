//! # Value type system
//!
//! A small tagged value type shared by every component that touches row
//! data: the expression evaluator, the rank/aggregate materializers, and
//! the CSV boundary. Values are loosely typed — the type of a column is
//! declared in the universe (`attr_data_type`), but arithmetic and
//! comparisons coerce where the SQL-subset grammar expects them to.

use std::cmp::Ordering;
use std::fmt;

/// The declared type of an attribute, taken from `attr_data_type` in the
/// universe JSON. Unrecognized strings fall back to [`DataType::Unknown`]
/// rather than rejecting the universe — the core only actually branches on
/// [`Value`]'s runtime variant, so a precise declared type is advisory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Float,
    String,
    Bool,
    Unknown(String),
}

impl DataType {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" => DataType::Int,
            "FLOAT" | "DOUBLE" | "DECIMAL" | "NUMERIC" | "REAL" => DataType::Float,
            "STRING" | "VARCHAR" | "TEXT" | "CHAR" => DataType::String,
            "BOOL" | "BOOLEAN" => DataType::Bool,
            other => DataType::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::String => write!(f, "STRING"),
            DataType::Bool => write!(f, "BOOL"),
            DataType::Unknown(s) => write!(f, "{s}"),
        }
    }
}

/// A single cell value.
///
/// `Int`/`Float` are kept distinct rather than unified into `f64` so that
/// integer input columns round-trip exactly through CSV and so numeric
/// literals in expressions preserve the literal's own type (matching the
/// parser's `numeric_literal` production, which yields an int or a float
/// depending on whether a decimal point/exponent was present).
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Float(_) => DataType::Float,
            Value::Str(_) => DataType::String,
            Value::Bool(_) => DataType::Bool,
            Value::Null => DataType::Unknown("NULL".to_string()),
        }
    }

    /// Numeric view used by arithmetic and aggregation. Returns `None` for
    /// non-numeric, non-null values (callers treat that as a null result,
    /// per spec §4.7's "type mismatch at evaluation ⇒ null").
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Three-valued truthiness used when a filter/mask expression is
    /// collapsed to a boolean column: null (or any non-boolean-coercible
    /// value) evaluates false, never an error (spec §4.7).
    pub fn truthy(&self) -> bool {
        self.as_bool().unwrap_or(false)
    }

    /// Ordering used by ranking: nulls sort last regardless of direction
    /// (spec §4.4 "Nulls"). Returns `Ordering::Equal` only for genuinely
    /// equal, comparable values.
    pub fn rank_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.partial_cmp(other).unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, ""),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            _ => self.as_f64()?.partial_cmp(&other.as_f64()?),
        }
    }
}

/// Hashable/comparable key extracted from a [`Value`] for use as a
/// partition key (`HashMap<PartitionKey, _>` in the execution engine).
/// `NULL` is its own partition, per spec §4.7's "partition key missing ⇒
/// treated as a single partition ... (null is its own partition)".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartitionKey {
    Int(i64),
    /// Float bit pattern — exact equality is what partitioning needs, not
    /// numeric tolerance.
    FloatBits(u64),
    Str(String),
    Bool(bool),
    Null,
}

impl From<&Value> for PartitionKey {
    fn from(v: &Value) -> Self {
        match v {
            Value::Int(i) => PartitionKey::Int(*i),
            Value::Float(f) => PartitionKey::FloatBits(f.to_bits()),
            Value::Str(s) => PartitionKey::Str(s.clone()),
            Value::Bool(b) => PartitionKey::Bool(*b),
            Value::Null => PartitionKey::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_float_equal_across_variants() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
    }

    #[test]
    fn null_sorts_last_both_directions() {
        let mut v = vec![Value::Int(3), Value::Null, Value::Int(1)];
        v.sort_by(Value::rank_cmp);
        assert_eq!(v, vec![Value::Int(1), Value::Int(3), Value::Null]);
    }

    #[test]
    fn data_type_parsing_is_case_insensitive() {
        assert_eq!(DataType::parse("int"), DataType::Int);
        assert_eq!(DataType::parse("Varchar"), DataType::String);
    }
}
