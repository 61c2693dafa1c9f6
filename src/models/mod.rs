mod edges;
mod elements;
mod identifiers;
mod ids;
mod properties;
mod values;
mod vertices;

pub use edges::{Direction, Edge};
pub use elements::{is_reserved_key, Element, Propertied, RESERVED_KEYS};
pub use identifiers::Identifier;
pub use ids::Id;
pub use properties::{Cardinality, VertexProperty};
pub use values::{Comparability, Value};
pub use vertices::Vertex;
