use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::Error;
use crate::models::{Cardinality, Direction};

use serde::{Deserialize, Serialize};

/// A dynamically typed property value.
///
/// Equality is structural: two values are equal only when they have the same
/// variant and the same contents. Floats compare and hash by their bit
/// patterns, so values are usable as index bucket keys; the trade-off is
/// that `0.0` and `-0.0` are distinct and `NaN` equals itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Direction(Direction),
    Cardinality(Cardinality),
}

/// The partition of values that can be ordered against each other in a
/// range index. Values from different classes have no mutual order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Comparability {
    Numeric,
    Text,
}

impl Value {
    /// Builds a set value, dropping duplicates while preserving the first
    /// occurrence order.
    pub fn set(values: Vec<Value>) -> Value {
        let mut deduped: Vec<Value> = Vec::with_capacity(values.len());
        for value in values {
            if !deduped.contains(&value) {
                deduped.push(value);
            }
        }
        Value::Set(deduped)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::I32(_) | Value::I64(_) | Value::F32(_) | Value::F64(_))
    }

    /// Numeric coercion used by range evaluation and aggregation.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I32(n) => Some(*n as f64),
            Value::I64(n) => Some(*n as f64),
            Value::F32(n) => Some(*n as f64),
            Value::F64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::I32(n) if *n >= 0 => Some(*n as u64),
            Value::I64(n) if *n >= 0 => Some(*n as u64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The comparability class of this value, if it has one.
    pub fn comparability(&self) -> Option<Comparability> {
        match self {
            Value::I32(_) | Value::I64(_) | Value::F32(_) | Value::F64(_) => Some(Comparability::Numeric),
            Value::Str(_) => Some(Comparability::Text),
            _ => None,
        }
    }

    /// Orders two values of the same comparability class; `None` when the
    /// classes differ or either value has none.
    pub fn compare_comparable(&self, other: &Value) -> Option<Ordering> {
        match (self.comparability()?, other.comparability()?) {
            (Comparability::Numeric, Comparability::Numeric) => {
                // as_f64 is total over numeric variants
                Some(self.as_f64()?.total_cmp(&other.as_f64()?))
            }
            (Comparability::Text, Comparability::Text) => Some(self.as_str()?.cmp(other.as_str()?)),
            _ => None,
        }
    }

    /// A rough in-memory footprint, used by the cache's byte accounting.
    pub fn estimated_size(&self) -> usize {
        let base = std::mem::size_of::<Value>();
        match self {
            Value::Str(s) => base + s.len(),
            Value::Bytes(b) => base + b.len(),
            Value::List(vs) | Value::Set(vs) => base + vs.iter().map(Value::estimated_size).sum::<usize>(),
            Value::Map(entries) => {
                base + entries
                    .iter()
                    .map(|(k, v)| k.estimated_size() + v.estimated_size())
                    .sum::<usize>()
            }
            _ => base,
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::I32(_) => 2,
            Value::I64(_) => 3,
            Value::F32(_) => 4,
            Value::F64(_) => 5,
            Value::Str(_) => 6,
            Value::Bytes(_) => 7,
            Value::List(_) => 8,
            Value::Set(_) => 9,
            Value::Map(_) => 10,
            Value::Direction(_) => 11,
            Value::Cardinality(_) => 12,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::I32(a), Value::I32(b)) => a.cmp(b),
            (Value::I64(a), Value::I64(b)) => a.cmp(b),
            (Value::F32(a), Value::F32(b)) => a.total_cmp(b),
            (Value::F64(a), Value::F64(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Direction(a), Value::Direction(b)) => a.cmp(b),
            (Value::Cardinality(a), Value::Cardinality(b)) => a.cmp(b),
            _ => self.variant_rank().cmp(&other.variant_rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(self.variant_rank());
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::I32(n) => n.hash(state),
            Value::I64(n) => n.hash(state),
            Value::F32(n) => n.to_bits().hash(state),
            Value::F64(n) => n.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::List(vs) | Value::Set(vs) => vs.hash(state),
            Value::Map(entries) => entries.hash(state),
            Value::Direction(d) => d.hash(state),
            Value::Cardinality(c) => c.hash(state),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(n) => write!(f, "{}", n),
            Value::I64(n) => write!(f, "{}", n),
            Value::F32(n) => write!(f, "{}", n),
            Value::F64(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Set(vs) => {
                write!(f, "{{")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "}}")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Direction(d) => write!(f, "{}", d),
            Value::Cardinality(c) => write!(f, "{}", c),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::I64(i)
                } else {
                    Value::F64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<&Value> for serde_json::Value {
    type Error = Error;

    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        let json = match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::I32(n) => serde_json::Value::from(*n),
            Value::I64(n) => serde_json::Value::from(*n),
            Value::F32(n) => serde_json::Number::from_f64(*n as f64)
                .map(serde_json::Value::Number)
                .ok_or_else(|| Error::MalformedExternalInput("non-finite float".to_string()))?,
            Value::F64(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .ok_or_else(|| Error::MalformedExternalInput("non-finite float".to_string()))?,
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::Array(b.iter().map(|byte| serde_json::Value::from(*byte)).collect()),
            Value::List(vs) | Value::Set(vs) => {
                let items: Result<Vec<_>, Error> = vs.iter().map(serde_json::Value::try_from).collect();
                serde_json::Value::Array(items?)
            }
            Value::Map(entries) => {
                let mut map = serde_json::Map::with_capacity(entries.len());
                for (k, v) in entries {
                    let key = k
                        .as_str()
                        .ok_or_else(|| Error::MalformedExternalInput("map key is not a string".to_string()))?;
                    map.insert(key.to_string(), serde_json::Value::try_from(v)?);
                }
                serde_json::Value::Object(map)
            }
            Value::Direction(d) => serde_json::Value::String(d.to_string()),
            Value::Cardinality(c) => serde_json::Value::String(c.to_string()),
        };
        Ok(json)
    }
}
