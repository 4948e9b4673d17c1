//! Bindable values and clause operands.
//!
//! A [`Value`] is plain data that ends up in the bindings array (or, rarely,
//! inlined through the escape formatter). An [`Operand`] is what a clause entry
//! holds: a value, a raw expression, a nested builder, or a deferred callback
//! that builds a sub-query at compile time.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::builder::QueryBuilder;
use super::raw::Raw;

// ============================================================================
// Value
// ============================================================================

/// A value that can be sent to the driver as a parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// A hole: the caller never provided a value.
    ///
    /// In an insert row this means "use the column default"; anywhere else
    /// it is a binding error.
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Json(serde_json::Value),
}

impl Value {
    /// Binary payload.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(data.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether an `Undefined` appears anywhere inside this value.
    pub fn contains_undefined(&self) -> bool {
        match self {
            Value::Undefined => true,
            Value::Array(items) => items.iter().any(Value::contains_undefined),
            _ => false,
        }
    }

    /// Positions (top level) of array items that contain an `Undefined`.
    pub fn undefined_indices(&self) -> Vec<usize> {
        match self {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .filter(|(_, v)| v.contains_undefined())
                .map(|(i, _)| i)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Text used where the value is needed as a plain string (JSON paths,
    /// default values).
    pub fn as_text(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => s.clone(),
            Value::Date(d) => d.to_rfc3339(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Value::Array(items) => items
                .iter()
                .map(Value::as_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Json(j) => j.to_string(),
        }
    }
}

/// Decimal text for a float, dropping the fraction for integral values.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        ryu::Buffer::new().format(f).to_string()
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Deferred sub-builders
// ============================================================================

/// A callback that fills a fresh sub-builder when the parent is compiled.
#[derive(Clone)]
pub struct Deferred(Arc<dyn Fn(&mut QueryBuilder) + Send + Sync>);

impl Deferred {
    pub fn new(f: impl Fn(&mut QueryBuilder) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Run the callback against an empty builder.
    pub fn build(&self) -> QueryBuilder {
        let mut qb = QueryBuilder::new();
        (self.0)(&mut qb);
        qb
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Deferred(..)")
    }
}

// ============================================================================
// Operand
// ============================================================================

/// A clause entry value.
///
/// Strings are interpreted by position: an identifier where a column or table
/// is expected, a bound value where a value is expected.
#[derive(Debug, Clone)]
pub enum Operand {
    Value(Value),
    Raw(Raw),
    Query(Box<QueryBuilder>),
    Deferred(Deferred),
}

impl Operand {
    /// A sub-query built lazily from a callback.
    pub fn sub(f: impl Fn(&mut QueryBuilder) + Send + Sync + 'static) -> Self {
        Operand::Deferred(Deferred::new(f))
    }

    /// The string payload, when this operand is a plain string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Operand::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Operand::Value(v) if v.contains_undefined())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Value(Value::Null))
    }

    /// Whether this operand renders a query (and so needs parentheses when
    /// used as a value).
    pub fn is_query(&self) -> bool {
        matches!(self, Operand::Query(_) | Operand::Deferred(_))
    }
}

macro_rules! operand_from_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Operand {
                fn from(v: $t) -> Self {
                    Operand::Value(Value::from(v))
                }
            }
        )*
    };
}

operand_from_value!(
    bool,
    i32,
    i64,
    u32,
    f32,
    f64,
    &str,
    String,
    DateTime<Utc>,
    serde_json::Value,
    Value,
);

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        Operand::Value(v.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Operand {
    fn from(v: Vec<T>) -> Self {
        Operand::Value(v.into())
    }
}

impl From<&String> for Operand {
    fn from(v: &String) -> Self {
        Operand::Value(Value::String(v.clone()))
    }
}

impl From<Raw> for Operand {
    fn from(v: Raw) -> Self {
        Operand::Raw(v)
    }
}

impl From<QueryBuilder> for Operand {
    fn from(v: QueryBuilder) -> Self {
        Operand::Query(Box::new(v))
    }
}

impl From<&mut QueryBuilder> for Operand {
    fn from(v: &mut QueryBuilder) -> Self {
        Operand::Query(Box::new(v.clone()))
    }
}

impl From<Deferred> for Operand {
    fn from(v: Deferred) -> Self {
        Operand::Deferred(v)
    }
}

// ============================================================================
// Row
// ============================================================================

/// An ordered column → value mapping used for inserts and updates.
#[derive(Debug, Clone, Default)]
pub struct Row(Vec<(String, Operand)>);

impl Row {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Set a column, replacing an earlier value for the same key in place.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Operand>) {
        let column = column.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == column) {
            Some(slot) => slot.1 = value,
            None => self.0.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Operand> {
        self.0.iter().find(|(k, _)| k == column).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Operand)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Operand>, const N: usize> From<[(K, V); N]> for Row {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<Operand>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_undefined_nested() {
        let v = Value::Array(vec![
            Value::Int(1),
            Value::Array(vec![Value::Null, Value::Undefined]),
        ]);
        assert!(v.contains_undefined());
        assert_eq!(v.undefined_indices(), vec![1]);
        assert!(!Value::Array(vec![Value::Null]).contains_undefined());
    }

    #[test]
    fn test_row_preserves_first_seen_order() {
        let row = Row::new().set("b", 1).set("a", 2).set("b", 3);
        let keys: Vec<_> = row.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(matches!(row.get("b"), Some(Operand::Value(Value::Int(3)))));
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1");
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(-0.25), "-0.25");
    }

    #[test]
    fn test_option_maps_to_null() {
        let none: Option<i64> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }
}
