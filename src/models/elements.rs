use crate::errors::{Error, Result};
use crate::models::{Id, Identifier, Value};

/// Property keys that name element-level fields and therefore cannot be
/// used as user property keys.
pub const RESERVED_KEYS: [&str; 2] = ["id", "label"];

/// Whether a key names a reserved element field.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Behaviour common to vertices, edges and vertex properties.
pub trait Element {
    fn id(&self) -> Id;
    fn label(&self) -> &Identifier;
    fn is_removed(&self) -> bool;

    /// Gates every state-changing or state-reading operation on a
    /// tombstoned element.
    fn ensure_live(&self) -> Result<()> {
        if self.is_removed() {
            Err(Error::ElementRemoved)
        } else {
            Ok(())
        }
    }
}

/// Read access to an element's live property values, used by the query
/// evaluator and the composite index without knowing the element class.
pub trait Propertied {
    /// All live values under a key, in insertion order.
    fn live_values(&self, key: &Identifier) -> Vec<&Value>;

    /// The first live value under a key.
    fn first_value(&self, key: &Identifier) -> Option<&Value> {
        self.live_values(key).into_iter().next()
    }

    /// Keys with at least one live value.
    fn live_keys(&self) -> Vec<Identifier>;

    fn has_live_value(&self, key: &Identifier) -> bool {
        !self.live_values(key).is_empty()
    }
}
