use std::collections::{BTreeMap, BTreeSet};

use crate::errors::{Error, Result};
use crate::models::{Cardinality, Direction, Element, Id, Identifier, Propertied, Value, VertexProperty};

use serde::{Deserialize, Serialize};

/// What a property insert displaced: the ids and values of the properties
/// that were tombstoned to make room (only non-empty under `Single`
/// cardinality). The graph uses this to emit index removals.
#[derive(Debug, Default)]
pub(crate) struct PropertyInsert {
    pub replaced: Vec<(Id, Value)>,
}

/// A vertex: adjacency lists keyed by edge label, a multi-property store,
/// and the per-key cardinality map.
///
/// All mutation goes through the owning graph, which keeps the secondary
/// indices in sync; the methods here only maintain the vertex's own
/// invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub(crate) id: Id,
    pub(crate) label: Identifier,
    pub(crate) properties: BTreeMap<Identifier, Vec<VertexProperty>>,
    pub(crate) cardinalities: BTreeMap<Identifier, Cardinality>,
    pub(crate) out_edges: BTreeMap<Identifier, BTreeSet<Id>>,
    pub(crate) in_edges: BTreeMap<Identifier, BTreeSet<Id>>,
    pub(crate) removed: bool,
}

impl Vertex {
    pub(crate) fn new(id: Id, label: Identifier) -> Self {
        Self {
            id,
            label,
            properties: BTreeMap::new(),
            cardinalities: BTreeMap::new(),
            out_edges: BTreeMap::new(),
            in_edges: BTreeMap::new(),
            removed: false,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// All live values for a key, in insertion order.
    pub fn values(&self, key: &Identifier) -> Vec<&Value> {
        self.live_properties(key).map(|p| &p.value).collect()
    }

    /// The first live value for a key.
    pub fn value(&self, key: &Identifier) -> Option<&Value> {
        self.live_properties(key).next().map(|p| &p.value)
    }

    pub fn has_property(&self, key: &Identifier) -> bool {
        self.live_properties(key).next().is_some()
    }

    /// The number of live properties for a key.
    pub fn property_count(&self, key: &Identifier) -> usize {
        self.live_properties(key).count()
    }

    /// The recorded cardinality for a key; absent when the key has no live
    /// properties.
    pub fn cardinality(&self, key: &Identifier) -> Option<Cardinality> {
        self.cardinalities.get(key).copied()
    }

    /// Live vertex properties for a key.
    pub fn vertex_properties(&self, key: &Identifier) -> Vec<&VertexProperty> {
        self.live_properties(key).collect()
    }

    /// Keys with at least one live property, in key order.
    pub fn property_keys(&self) -> Vec<&Identifier> {
        self.properties
            .iter()
            .filter(|(_, props)| props.iter().any(|p| !p.removed))
            .map(|(key, _)| key)
            .collect()
    }

    /// Incident edge ids. An empty label slice matches every label. For
    /// `Both`, outbound edges come first; a self-loop appears twice.
    pub fn edge_ids(&self, direction: Direction, labels: &[Identifier]) -> Vec<Id> {
        fn collect(map: &BTreeMap<Identifier, BTreeSet<Id>>, labels: &[Identifier]) -> Vec<Id> {
            if labels.is_empty() {
                map.values().flatten().copied().collect()
            } else {
                labels.iter().filter_map(|l| map.get(l)).flatten().copied().collect()
            }
        }

        match direction {
            Direction::Out => collect(&self.out_edges, labels),
            Direction::In => collect(&self.in_edges, labels),
            Direction::Both => {
                let mut ids = collect(&self.out_edges, labels);
                ids.extend(collect(&self.in_edges, labels));
                ids
            }
        }
    }

    fn live_properties<'a>(&'a self, key: &Identifier) -> impl Iterator<Item = &'a VertexProperty> {
        self.properties
            .get(key)
            .into_iter()
            .flatten()
            .filter(|p| !p.removed)
    }

    /// The cardinality a new property for `key` takes: an explicit argument
    /// wins, else the recorded cardinality, else the graph default.
    pub(crate) fn effective_cardinality(
        &self,
        key: &Identifier,
        explicit: Option<Cardinality>,
        default: Cardinality,
    ) -> Cardinality {
        explicit
            .or_else(|| self.cardinalities.get(key).copied())
            .unwrap_or(default)
    }

    /// Inserts a property under an already-resolved cardinality.
    ///
    /// Under `Single`, existing live properties for the key are tombstoned
    /// first and reported in the outcome. Under `Set`, an equal live value
    /// fails with `DuplicateSetValue` and nothing changes.
    pub(crate) fn insert_property(
        &mut self,
        prop: VertexProperty,
        cardinality: Cardinality,
    ) -> Result<PropertyInsert> {
        let key = prop.key.clone();
        let mut outcome = PropertyInsert::default();

        match cardinality {
            Cardinality::Single => {
                if let Some(props) = self.properties.get_mut(&key) {
                    for existing in props.iter_mut().filter(|p| !p.removed) {
                        existing.removed = true;
                        outcome.replaced.push((existing.id, existing.value.clone()));
                    }
                }
            }
            Cardinality::Set => {
                let duplicate = self.live_properties(&key).any(|p| p.value == prop.value);
                if duplicate {
                    return Err(Error::DuplicateSetValue);
                }
            }
            Cardinality::List => {}
        }

        self.properties.entry(key.clone()).or_default().push(prop);
        self.cardinalities.insert(key, cardinality);
        Ok(outcome)
    }

    /// Tombstones live properties for a key, optionally only those whose
    /// value matches. Returns the ids and values of the removed properties.
    /// The cardinality entry goes away with the last live property.
    pub(crate) fn remove_properties(&mut self, key: &Identifier, value: Option<&Value>) -> Vec<(Id, Value)> {
        let mut removed = Vec::new();

        if let Some(props) = self.properties.get_mut(key) {
            for prop in props.iter_mut().filter(|p| !p.removed) {
                if value.map_or(true, |v| &prop.value == v) {
                    prop.removed = true;
                    removed.push((prop.id, prop.value.clone()));
                }
            }
            if props.iter().all(|p| p.removed) {
                self.cardinalities.remove(key);
            }
        }

        removed
    }

    pub(crate) fn property_by_id_mut(&mut self, id: Id) -> Option<&mut VertexProperty> {
        self.properties
            .values_mut()
            .flatten()
            .find(|p| p.id == id)
    }

    pub(crate) fn attach_out_edge(&mut self, label: Identifier, id: Id) {
        self.out_edges.entry(label).or_default().insert(id);
    }

    pub(crate) fn attach_in_edge(&mut self, label: Identifier, id: Id) {
        self.in_edges.entry(label).or_default().insert(id);
    }

    /// Drops an edge id from both adjacency maps, pruning empty label
    /// buckets.
    pub(crate) fn detach_edge(&mut self, label: &Identifier, id: Id) {
        if let Some(ids) = self.out_edges.get_mut(label) {
            ids.remove(&id);
            if ids.is_empty() {
                self.out_edges.remove(label);
            }
        }
        if let Some(ids) = self.in_edges.get_mut(label) {
            ids.remove(&id);
            if ids.is_empty() {
                self.in_edges.remove(label);
            }
        }
    }
}

impl Element for Vertex {
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

impl Propertied for Vertex {
    fn live_values(&self, key: &Identifier) -> Vec<&Value> {
        self.values(key)
    }

    fn live_keys(&self) -> Vec<Identifier> {
        self.property_keys().into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Vertex;
    use crate::models::{Cardinality, Id, Identifier, Value, VertexProperty};

    fn vertex() -> Vertex {
        Vertex::new(Id(1), Identifier::new("person").unwrap())
    }

    fn prop(id: u64, key: &str, value: Value) -> VertexProperty {
        VertexProperty::new(Id(id), Identifier::new(key).unwrap(), value)
    }

    #[test]
    fn should_replace_under_single_cardinality() {
        let mut v = vertex();
        let key = Identifier::new("name").unwrap();

        let outcome = v
            .insert_property(prop(10, "name", Value::from("alice")), Cardinality::Single)
            .unwrap();
        assert!(outcome.replaced.is_empty());

        let outcome = v
            .insert_property(prop(11, "name", Value::from("bob")), Cardinality::Single)
            .unwrap();
        assert_eq!(outcome.replaced, vec![(Id(10), Value::from("alice"))]);

        assert_eq!(v.values(&key), vec![&Value::from("bob")]);
        assert_eq!(v.property_count(&key), 1);
    }

    #[test]
    fn should_reject_duplicate_set_values() {
        let mut v = vertex();
        let key = Identifier::new("lang").unwrap();

        v.insert_property(prop(10, "lang", Value::from("en")), Cardinality::Set)
            .unwrap();
        v.insert_property(prop(11, "lang", Value::from("fr")), Cardinality::Set)
            .unwrap();
        assert!(v
            .insert_property(prop(12, "lang", Value::from("en")), Cardinality::Set)
            .is_err());
        assert_eq!(v.property_count(&key), 2);
    }

    #[test]
    fn should_keep_list_duplicates_in_order() {
        let mut v = vertex();
        let key = Identifier::new("tag").unwrap();

        v.insert_property(prop(10, "tag", Value::from("a")), Cardinality::List)
            .unwrap();
        v.insert_property(prop(11, "tag", Value::from("a")), Cardinality::List)
            .unwrap();
        v.insert_property(prop(12, "tag", Value::from("b")), Cardinality::List)
            .unwrap();

        assert_eq!(
            v.values(&key),
            vec![&Value::from("a"), &Value::from("a"), &Value::from("b")]
        );
    }

    #[test]
    fn should_drop_cardinality_with_last_property() {
        let mut v = vertex();
        let key = Identifier::new("lang").unwrap();

        v.insert_property(prop(10, "lang", Value::from("en")), Cardinality::Set)
            .unwrap();
        v.insert_property(prop(11, "lang", Value::from("fr")), Cardinality::Set)
            .unwrap();
        assert_eq!(v.cardinality(&key), Some(Cardinality::Set));

        let removed = v.remove_properties(&key, Some(&Value::from("en")));
        assert_eq!(removed.len(), 1);
        assert_eq!(v.cardinality(&key), Some(Cardinality::Set));

        let removed = v.remove_properties(&key, None);
        assert_eq!(removed.len(), 1);
        assert_eq!(v.cardinality(&key), None);
        assert!(!v.has_property(&key));
    }

    #[test]
    fn should_track_adjacency_per_label() {
        let mut v = vertex();
        let knows = Identifier::new("knows").unwrap();
        let likes = Identifier::new("likes").unwrap();

        v.attach_out_edge(knows.clone(), Id(100));
        v.attach_out_edge(likes.clone(), Id(101));
        v.attach_in_edge(knows.clone(), Id(102));

        use crate::models::Direction;
        assert_eq!(v.edge_ids(Direction::Out, &[]), vec![Id(100), Id(101)]);
        assert_eq!(v.edge_ids(Direction::Out, &[knows.clone()]), vec![Id(100)]);
        assert_eq!(v.edge_ids(Direction::In, &[]), vec![Id(102)]);
        assert_eq!(
            v.edge_ids(Direction::Both, &[knows.clone()]),
            vec![Id(100), Id(102)]
        );

        v.detach_edge(&knows, Id(100));
        assert_eq!(v.edge_ids(Direction::Out, &[]), vec![Id(101)]);
    }
}
