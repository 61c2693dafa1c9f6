use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::models::{Id, Identifier, Value};

use serde::{Deserialize, Serialize};

/// The multiplicity rule for a vertex property key.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Cardinality {
    /// At most one live property per key.
    Single,
    /// Ordered, duplicates allowed.
    List,
    /// No duplicate values per key.
    Set,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Single => write!(f, "single"),
            Cardinality::List => write!(f, "list"),
            Cardinality::Set => write!(f, "set"),
        }
    }
}

impl FromStr for Cardinality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(Cardinality::Single),
            "list" => Ok(Cardinality::List),
            "set" => Ok(Cardinality::Set),
            _ => Err(Error::MalformedExternalInput(format!("unknown cardinality: {}", s))),
        }
    }
}

/// A property on a vertex.
///
/// Unlike a plain key/value pair, a vertex property is itself an element: it
/// has an id, can carry meta-properties, and has a removal flag that is
/// independent from its owner's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexProperty {
    pub(crate) id: Id,
    pub(crate) key: Identifier,
    pub(crate) value: Value,
    pub(crate) meta: BTreeMap<Identifier, Value>,
    pub(crate) removed: bool,
}

impl VertexProperty {
    pub(crate) fn new(id: Id, key: Identifier, value: Value) -> Self {
        Self {
            id,
            key,
            value,
            meta: BTreeMap::new(),
            removed: false,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// The property key, which doubles as the element label.
    pub fn key(&self) -> &Identifier {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Gets a meta-property value.
    pub fn meta_property(&self, key: &Identifier) -> Option<&Value> {
        self.meta.get(key)
    }

    /// All meta-properties, in key order.
    pub fn meta_properties(&self) -> &BTreeMap<Identifier, Value> {
        &self.meta
    }

    pub fn has_meta_properties(&self) -> bool {
        !self.meta.is_empty()
    }

    pub(crate) fn set_meta_property(&mut self, key: Identifier, value: Value) {
        self.meta.insert(key, value);
    }
}

impl crate::models::Element for VertexProperty {
    fn id(&self) -> Id {
        self.id
    }

    fn label(&self) -> &Identifier {
        &self.key
    }

    fn is_removed(&self) -> bool {
        self.removed
    }
}
