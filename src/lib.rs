//! `tinkerdb` - an embedded in-memory property graph database library.
//!
//! The data model is the TinkerPop property graph: labelled vertices,
//! labelled directed edges, and properties on both, with full
//! multi-property and meta-property semantics. Lookups are served by three
//! coordinated secondary indices (single-key, composite, range) behind a
//! cost-based criterion planner with a bounded result cache.
//!
//! ```
//! use tinkerdb::{Criterion, Graph, Identifier, Value};
//!
//! let mut graph = Graph::default();
//! let alice = graph
//!     .add_vertex(vec![
//!         ("label".to_string(), Value::from("person")),
//!         ("name".to_string(), Value::from("alice")),
//!         ("age".to_string(), Value::from(30i64)),
//!     ])
//!     .unwrap();
//!
//! let name = Identifier::new("name").unwrap();
//! let found = graph.query_vertices(&[Criterion::exact(name, "alice")]);
//! assert_eq!(found, vec![alice]);
//! ```
#![cfg_attr(feature = "bench-suite", feature(test))]

#[cfg(feature = "bench-suite")]
extern crate test;

#[cfg(feature = "bench-suite")]
pub mod benches;

#[cfg(any(test, feature = "test-suite"))]
pub mod tests;

pub mod codec;
mod errors;
mod graph;
mod indices;
mod models;
mod query;
pub mod storage;
mod util;

pub use crate::errors::{Error, Result, ValidationError, ValidationResult};
pub use crate::graph::{
    CardinalityReport, Config, ConstraintViolation, Features, Graph, PropertyEvent, PropertyListener,
    PropertyManager,
};
pub use crate::indices::{
    CacheKey, CacheStats, CompositeIndex, ElementKind, IndexCache, IndexKind, KeyIndex, RangeIndex,
};
pub use crate::models::{
    is_reserved_key, Cardinality, Comparability, Direction, Edge, Element, Id, Identifier, Propertied,
    Value, Vertex, VertexProperty, RESERVED_KEYS,
};
pub use crate::query::{
    AggregateOp, CompositeOp, Criterion, IndexRecommendation, Optimizer, PatternStats, QueryPlan,
    RecommendationKind, Strategy,
};
pub use crate::util::IdGenerator;
