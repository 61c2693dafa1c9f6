use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::models::{Id, Identifier, Value};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static WEIGHT: Lazy<Identifier> = Lazy::new(|| unsafe { Identifier::new_unchecked("weight") });

/// The direction of an edge relative to a vertex.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Direction {
    Out,
    In,
    Both,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Out => write!(f, "OUT"),
            Direction::In => write!(f, "IN"),
            Direction::Both => write!(f, "BOTH"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OUT" => Ok(Direction::Out),
            "IN" => Ok(Direction::In),
            "BOTH" => Ok(Direction::Both),
            _ => Err(Error::MalformedExternalInput(format!("unknown direction: {}", s))),
        }
    }
}

/// A directed edge between two vertices.
///
/// Endpoints are referenced by id; the graph's primary edge store owns the
/// edge, and both endpoints' adjacency lists reference it by id too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub(crate) id: Id,
    pub(crate) label: Identifier,
    pub(crate) outbound_id: Id,
    pub(crate) inbound_id: Id,
    pub(crate) properties: BTreeMap<Identifier, Value>,
    pub(crate) removed: bool,
}

impl Edge {
    pub(crate) fn new(id: Id, label: Identifier, outbound_id: Id, inbound_id: Id) -> Self {
        Self {
            id,
            label,
            outbound_id,
            inbound_id,
            properties: BTreeMap::new(),
            removed: false,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    pub fn outbound_id(&self) -> Id {
        self.outbound_id
    }

    pub fn inbound_id(&self) -> Id {
        self.inbound_id
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// The endpoint in the given direction; `None` for `Both`, which has no
    /// single endpoint (use `vertex_ids`).
    pub fn vertex_id(&self, direction: Direction) -> Option<Id> {
        match direction {
            Direction::Out => Some(self.outbound_id),
            Direction::In => Some(self.inbound_id),
            Direction::Both => None,
        }
    }

    /// Endpoints in the given direction. For `Both`, outbound comes first;
    /// a self-loop yields the same id twice.
    pub fn vertex_ids(&self, direction: Direction) -> Vec<Id> {
        match direction {
            Direction::Out => vec![self.outbound_id],
            Direction::In => vec![self.inbound_id],
            Direction::Both => vec![self.outbound_id, self.inbound_id],
        }
    }

    /// Given one endpoint, the other.
    ///
    /// # Errors
    /// Returns `VertexNotIncident` if `id` is neither endpoint.
    pub fn other_vertex_id(&self, id: Id) -> Result<Id> {
        if id == self.outbound_id {
            Ok(self.inbound_id)
        } else if id == self.inbound_id {
            Ok(self.outbound_id)
        } else {
            Err(Error::VertexNotIncident)
        }
    }

    pub fn property(&self, key: &Identifier) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &BTreeMap<Identifier, Value> {
        &self.properties
    }

    pub fn property_keys(&self) -> Vec<&Identifier> {
        self.properties.keys().collect()
    }

    /// The `weight` property as a float, defaulting to 1.0.
    pub fn weight(&self) -> f64 {
        self.property(&WEIGHT).and_then(Value::as_f64).unwrap_or(1.0)
    }

    pub(crate) fn set_property(&mut self, key: Identifier, value: Value) -> Option<Value> {
        self.properties.insert(key, value)
    }

    pub(crate) fn remove_property(&mut self, key: &Identifier) -> Option<Value> {
        self.properties.remove(key)
    }
}

impl crate::models::Element for Edge {
    fn id(&self) -> Id {
        self.id
    }

    fn label(&self) -> &Identifier {
        &self.label
    }

    fn is_removed(&self) -> bool {
        self.removed
    }
}

impl crate::models::Propertied for Edge {
    fn live_values(&self, key: &Identifier) -> Vec<&Value> {
        self.property(key).into_iter().collect()
    }

    fn live_keys(&self) -> Vec<Identifier> {
        self.properties.keys().cloned().collect()
    }
}
