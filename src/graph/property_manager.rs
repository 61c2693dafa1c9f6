use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::errors::{Error, Result};
use crate::graph::Config;
use crate::models::{Cardinality, Id, Identifier, Value, Vertex};

/// A property lifecycle notification delivered to registered listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyEvent {
    Added {
        vertex_id: Id,
        key: Identifier,
        value: Value,
    },
    Removed {
        vertex_id: Id,
        key: Identifier,
        value: Value,
    },
}

/// A listener callback. Returning an error does not abort the mutation
/// that triggered the event; the error is logged and dropped.
pub type PropertyListener = Box<dyn Fn(&PropertyEvent) -> std::result::Result<(), String> + Send + Sync>;

/// Per-key multiplicity statistics for one vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardinalityReport {
    pub total_count: usize,
    pub unique_count: usize,
    pub suggested_cardinality: Cardinality,
    pub has_meta_properties: bool,
}

/// A detected breach of the recorded cardinality discipline.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintViolation {
    /// A `Single` key carries more than one live property.
    SingleWithMultiple { key: Identifier, count: usize },
    /// A `Set` key carries the same value more than once.
    SetWithDuplicates { key: Identifier, value: Value },
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintViolation::SingleWithMultiple { key, count } => {
                write!(f, "key '{}' has cardinality single but {} live properties", key, count)
            }
            ConstraintViolation::SetWithDuplicates { key, value } => {
                write!(f, "key '{}' has cardinality set but duplicates value {}", key, value)
            }
        }
    }
}

/// Wraps vertex property mutation with feature validation, lifecycle
/// listeners, and cardinality diagnostics. The graph consults it on every
/// property write.
#[derive(Default)]
pub struct PropertyManager {
    listeners: Vec<PropertyListener>,
}

impl fmt::Debug for PropertyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyManager")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl PropertyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: PropertyListener) {
        self.listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Delivers an event to every listener. Listener failures are logged
    /// and suppressed.
    pub(crate) fn notify(&self, event: &PropertyEvent) {
        for listener in &self.listeners {
            if let Err(message) = listener(event) {
                log::warn!("property listener failed on {:?}: {}", event, message);
            }
        }
    }

    /// Checks a pending property write against the graph's feature toggles.
    pub(crate) fn validate_features(
        &self,
        config: &Config,
        cardinality: Cardinality,
        has_meta: bool,
    ) -> Result<()> {
        if !config.supports_multi_properties && cardinality != Cardinality::Single {
            return Err(Error::MultiPropertyNotSupported);
        }
        if !config.supports_meta_properties && has_meta {
            return Err(Error::MetaPropertyNotSupported);
        }
        Ok(())
    }

    /// Per-key multiplicity statistics: how many live properties, how many
    /// distinct values, and the cardinality that profile suggests.
    pub fn analyze_cardinality(&self, vertex: &Vertex) -> BTreeMap<Identifier, CardinalityReport> {
        let mut report = BTreeMap::new();
        for key in vertex.property_keys() {
            let props = vertex.vertex_properties(key);
            let total_count = props.len();
            let unique_count = props.iter().map(|p| p.value()).collect::<HashSet<_>>().len();
            let suggested_cardinality = if total_count <= 1 {
                Cardinality::Single
            } else if unique_count == total_count {
                Cardinality::List
            } else {
                Cardinality::Set
            };
            let has_meta_properties = props.iter().any(|p| p.has_meta_properties());
            report.insert(
                key.clone(),
                CardinalityReport {
                    total_count,
                    unique_count,
                    suggested_cardinality,
                    has_meta_properties,
                },
            );
        }
        report
    }

    /// Scans a vertex for breaches of its recorded cardinalities.
    pub fn validate_constraints(&self, vertex: &Vertex) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();
        for key in vertex.property_keys() {
            let values = vertex.values(key);
            match vertex.cardinality(key) {
                Some(Cardinality::Single) if values.len() > 1 => {
                    violations.push(ConstraintViolation::SingleWithMultiple {
                        key: key.clone(),
                        count: values.len(),
                    });
                }
                Some(Cardinality::Set) => {
                    let mut seen: HashSet<&Value> = HashSet::new();
                    for value in values {
                        if !seen.insert(value) {
                            violations.push(ConstraintViolation::SetWithDuplicates {
                                key: key.clone(),
                                value: value.clone(),
                            });
                            break;
                        }
                    }
                }
                _ => {}
            }
        }
        violations
    }
}
