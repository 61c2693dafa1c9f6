mod cache;
mod composite;
mod key;
mod range;

pub use cache::{CacheKey, CacheStats, IndexCache};
pub use composite::CompositeIndex;
pub use key::KeyIndex;
pub use range::RangeIndex;

use std::fmt;
use std::str::FromStr;

use crate::errors::Error;

use serde::{Deserialize, Serialize};

/// The element class an index covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Vertex => write!(f, "vertex"),
            ElementKind::Edge => write!(f, "edge"),
        }
    }
}

impl FromStr for ElementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vertex" => Ok(ElementKind::Vertex),
            "edge" => Ok(ElementKind::Edge),
            _ => Err(Error::IndexClassInvalid),
        }
    }
}

/// Which of the three index structures answered a lookup; used in cache
/// keys and invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Key,
    Composite,
    Range,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Key => write!(f, "key"),
            IndexKind::Composite => write!(f, "composite"),
            IndexKind::Range => write!(f, "range"),
        }
    }
}

/// The three coordinated index structures for one element class.
#[derive(Debug, Default)]
pub(crate) struct IndexSet {
    pub key: KeyIndex,
    pub composite: CompositeIndex,
    pub range: RangeIndex,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::ElementKind;
    use std::str::FromStr;

    #[test]
    fn should_parse_element_kind() {
        assert_eq!(ElementKind::from_str("vertex").unwrap(), ElementKind::Vertex);
        assert_eq!(ElementKind::from_str("edge").unwrap(), ElementKind::Edge);
        assert!(ElementKind::from_str("table").is_err());
    }
}
