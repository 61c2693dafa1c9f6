mod property_manager;

pub use property_manager::{
    CardinalityReport, ConstraintViolation, PropertyEvent, PropertyListener, PropertyManager,
};

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::errors::{Error, Result};
use crate::indices::{CacheStats, ElementKind, IndexCache, IndexSet};
use crate::models::{
    is_reserved_key, Cardinality, Direction, Edge, Element, Id, Identifier, Value, Vertex, VertexProperty,
};
use crate::query::criteria::RegexCache;
use crate::query::{IndexRecommendation, Optimizer};
use crate::util::IdGenerator;

use once_cell::sync::Lazy;

static DEFAULT_VERTEX_LABEL: Lazy<Identifier> = Lazy::new(|| unsafe { Identifier::new_unchecked("vertex") });

/// Graph-wide configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// When false, property writes with a null value fail.
    pub allow_null_property_values: bool,
    /// The cardinality used when a property write doesn't specify one and
    /// the key has no recorded cardinality yet.
    pub default_vertex_property_cardinality: Cardinality,
    /// Whether more than one property may share a key on a vertex.
    pub supports_multi_properties: bool,
    /// Whether vertex properties may carry meta-properties.
    pub supports_meta_properties: bool,
    /// Consumed by external persistence, not the engine.
    pub graph_location: Option<PathBuf>,
    /// Consumed by external persistence, not the engine.
    pub graph_format: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_null_property_values: false,
            default_vertex_property_cardinality: Cardinality::Single,
            supports_multi_properties: true,
            supports_meta_properties: true,
            graph_location: None,
            graph_format: None,
        }
    }
}

/// The feature surface this graph instance exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub multi_properties: bool,
    pub meta_properties: bool,
    pub null_property_values: bool,
    pub user_supplied_ids: bool,
    pub variables: bool,
}

/// The in-memory property graph: owner of every element, every index, and
/// every mutation path.
///
/// Elements are stored in id-keyed arenas; adjacency lists hold ids, so
/// ownership questions are plain lookups. Every mutation updates the
/// primary store, drives the three secondary indices for the element's
/// class through their update hooks, and invalidates affected cache
/// entries before returning, so index state is consistent at every
/// mutation boundary.
///
/// The query-side state (caches, optimizer statistics, the compiled-regex
/// memo) sits behind locks so reads work through `&self`; the engine
/// itself is single-writer.
#[derive(Debug)]
pub struct Graph {
    pub(crate) config: Config,
    pub(crate) vertices: BTreeMap<Id, Vertex>,
    pub(crate) edges: BTreeMap<Id, Edge>,
    pub(crate) vertex_indices: IndexSet,
    pub(crate) edge_indices: IndexSet,
    pub(crate) vertex_cache: RwLock<IndexCache>,
    pub(crate) edge_cache: RwLock<IndexCache>,
    pub(crate) vertex_optimizer: RwLock<Optimizer>,
    pub(crate) edge_optimizer: RwLock<Optimizer>,
    pub(crate) property_manager: PropertyManager,
    pub(crate) variables: BTreeMap<String, Value>,
    pub(crate) vertex_ids: IdGenerator,
    pub(crate) edge_ids: IdGenerator,
    pub(crate) property_ids: IdGenerator,
    pub(crate) regexes: RegexCache,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tinkerdb[vertices:{} edges:{}]", self.vertex_count(), self.edge_count())
    }
}

impl Graph {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            vertex_indices: IndexSet::new(),
            edge_indices: IndexSet::new(),
            vertex_cache: RwLock::new(IndexCache::new()),
            edge_cache: RwLock::new(IndexCache::new()),
            vertex_optimizer: RwLock::new(Optimizer::new()),
            edge_optimizer: RwLock::new(Optimizer::new()),
            property_manager: PropertyManager::new(),
            variables: BTreeMap::new(),
            vertex_ids: IdGenerator::new(),
            edge_ids: IdGenerator::new(),
            property_ids: IdGenerator::new(),
            regexes: RegexCache::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn features(&self) -> Features {
        Features {
            multi_properties: self.config.supports_multi_properties,
            meta_properties: self.config.supports_meta_properties,
            null_property_values: self.config.allow_null_property_values,
            user_supplied_ids: true,
            variables: true,
        }
    }

    /// Registers a property lifecycle listener.
    pub fn add_property_listener(&mut self, listener: PropertyListener) {
        self.property_manager.add_listener(listener);
    }

    pub fn property_manager(&self) -> &PropertyManager {
        &self.property_manager
    }

    /// Releases the graph. All state is in memory, so this is drop.
    pub fn close(self) {}

    /// Drops every element, index, cache entry and variable, and resets
    /// the id allocators. Configuration and registered listeners survive.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
        self.vertex_indices = IndexSet::new();
        self.edge_indices = IndexSet::new();
        self.vertex_cache.write().unwrap().clear();
        self.edge_cache.write().unwrap().clear();
        *self.vertex_optimizer.write().unwrap() = Optimizer::new();
        *self.edge_optimizer.write().unwrap() = Optimizer::new();
        self.variables.clear();
        self.vertex_ids = IdGenerator::new();
        self.edge_ids = IdGenerator::new();
        self.property_ids = IdGenerator::new();
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// A read-only view of a vertex.
    ///
    /// # Errors
    /// `VertexNotFound` for an unknown id, `ElementRemoved` for a
    /// tombstoned one.
    pub fn vertex(&self, id: Id) -> Result<&Vertex> {
        let vertex = self.vertices.get(&id).ok_or(Error::VertexNotFound)?;
        vertex.ensure_live()?;
        Ok(vertex)
    }

    /// A read-only view of an edge.
    pub fn edge(&self, id: Id) -> Result<&Edge> {
        let edge = self.edges.get(&id).ok_or(Error::EdgeNotFound)?;
        edge.ensure_live()?;
        Ok(edge)
    }

    pub fn contains_vertex(&self, id: Id) -> bool {
        self.vertices.get(&id).map_or(false, |v| !v.is_removed())
    }

    pub fn contains_edge(&self, id: Id) -> bool {
        self.edges.get(&id).map_or(false, |e| !e.is_removed())
    }

    /// Live vertices in id order.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.vertices.values().filter(|v| !v.is_removed())
    }

    /// Live edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values().filter(|e| !e.is_removed())
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices().count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Incident edge ids of a vertex.
    pub fn vertex_edges(&self, id: Id, direction: Direction, labels: &[Identifier]) -> Result<Vec<Id>> {
        Ok(self.vertex(id)?.edge_ids(direction, labels))
    }

    /// Neighbouring vertex ids. A single direction yields one entry per
    /// edge (so parallel edges repeat their endpoint); `Both` suppresses
    /// duplicates by vertex id, first occurrence winning.
    pub fn adjacent_vertex_ids(&self, id: Id, direction: Direction, labels: &[Identifier]) -> Result<Vec<Id>> {
        let vertex = self.vertex(id)?;

        let resolve = |edge_id: Id, direction: Direction| -> Option<Id> {
            let edge = self.edges.get(&edge_id)?;
            match direction {
                Direction::Out => Some(edge.inbound_id()),
                Direction::In => Some(edge.outbound_id()),
                Direction::Both => None,
            }
        };

        match direction {
            Direction::Out | Direction::In => Ok(vertex
                .edge_ids(direction, labels)
                .into_iter()
                .filter_map(|edge_id| resolve(edge_id, direction))
                .collect()),
            Direction::Both => {
                let mut seen = HashSet::new();
                let mut ids = Vec::new();
                for single in [Direction::Out, Direction::In] {
                    for edge_id in vertex.edge_ids(single, labels) {
                        if let Some(other) = resolve(edge_id, single) {
                            if seen.insert(other) {
                                ids.push(other);
                            }
                        }
                    }
                }
                Ok(ids)
            }
        }
    }

    // ------------------------------------------------------------------
    // Graph variables
    // ------------------------------------------------------------------

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    /// Sets a graph variable. Keys must be non-empty.
    pub fn set_variable(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(Error::InvalidPropertyKey);
        }
        self.variables.insert(key, value);
        Ok(())
    }

    pub fn remove_variable(&mut self, key: &str) -> Option<Value> {
        self.variables.remove(key)
    }

    // ------------------------------------------------------------------
    // Vertex mutation
    // ------------------------------------------------------------------

    /// Creates a vertex from a property list. The reserved `id` and
    /// `label` entries name the element fields; everything else becomes a
    /// vertex property under the default cardinality rules.
    pub fn add_vertex(&mut self, props: Vec<(String, Value)>) -> Result<Id> {
        let mut user_id = None;
        let mut label = None;
        let mut rest = Vec::new();

        for (key, value) in props {
            match key.as_str() {
                "id" => {
                    let id = value
                        .as_u64()
                        .map(Id)
                        .ok_or_else(|| Error::MalformedExternalInput("vertex id must be a non-negative integer".to_string()))?;
                    user_id = Some(id);
                }
                "label" => {
                    let s = value
                        .as_str()
                        .ok_or_else(|| Error::MalformedExternalInput("label must be a string".to_string()))?;
                    label = Some(Identifier::new(s)?);
                }
                _ => rest.push((key, value)),
            }
        }

        let label = label.unwrap_or_else(|| DEFAULT_VERTEX_LABEL.clone());
        let id = self.create_vertex_internal(user_id, label)?;
        for (key, value) in rest {
            self.add_vertex_property(id, &key, value, None, Vec::new())?;
        }
        Ok(id)
    }

    /// Creates a bare vertex with a generated id.
    pub fn create_vertex(&mut self, label: Identifier) -> Result<Id> {
        self.create_vertex_internal(None, label)
    }

    /// Creates a bare vertex under a caller-chosen id.
    ///
    /// # Errors
    /// `IdAlreadyExists` if the id is taken (tombstoned ids stay taken).
    pub fn create_vertex_with_id(&mut self, id: Id, label: Identifier) -> Result<Id> {
        self.create_vertex_internal(Some(id), label)
    }

    /// Removes a vertex: every incident edge first, then the vertex's own
    /// index and cache entries, then the tombstone flip.
    pub fn remove_vertex(&mut self, id: Id) -> Result<()> {
        self.vertex(id)?;

        let incident: BTreeSet<Id> = self
            .vertices
            .get(&id)
            .map(|v| v.edge_ids(Direction::Both, &[]).into_iter().collect())
            .unwrap_or_default();
        for edge_id in incident {
            self.remove_edge(edge_id)?;
        }

        let mut removed_props: Vec<(Identifier, Value)> = Vec::new();
        if let Some(vertex) = self.vertices.get(&id) {
            for key in vertex.property_keys() {
                for prop in vertex.vertex_properties(key) {
                    removed_props.push((key.clone(), prop.value().clone()));
                }
            }
        }

        for (key, value) in &removed_props {
            self.vertex_indices.key.auto_update(key, None, Some(value), id);
            self.vertex_indices.range.remove(key, value, id);
        }
        self.vertex_indices.composite.detach_element(id);

        {
            let mut cache = self.vertex_cache.write().unwrap();
            cache.invalidate_element(id);
            for (key, _) in &removed_props {
                cache.invalidate_key(key.as_str());
            }
        }

        for (key, value) in &removed_props {
            self.property_manager.notify(&PropertyEvent::Removed {
                vertex_id: id,
                key: key.clone(),
                value: value.clone(),
            });
        }

        if let Some(vertex) = self.vertices.get_mut(&id) {
            vertex.removed = true;
        }
        log::debug!("removed vertex {} and {} properties", id, removed_props.len());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Edge mutation
    // ------------------------------------------------------------------

    /// Creates an edge from a property list; the reserved `id` entry picks
    /// the edge id.
    pub fn add_edge(
        &mut self,
        outbound_id: Id,
        inbound_id: Id,
        label: Identifier,
        props: Vec<(String, Value)>,
    ) -> Result<Id> {
        let mut user_id = None;
        let mut rest = Vec::new();

        for (key, value) in props {
            match key.as_str() {
                "id" => {
                    let id = value
                        .as_u64()
                        .map(Id)
                        .ok_or_else(|| Error::MalformedExternalInput("edge id must be a non-negative integer".to_string()))?;
                    user_id = Some(id);
                }
                "label" => return Err(Error::InvalidPropertyKey),
                _ => rest.push((key, value)),
            }
        }

        let id = self.create_edge_internal(user_id, outbound_id, inbound_id, label)?;
        for (key, value) in rest {
            self.set_edge_property(id, &key, value)?;
        }
        Ok(id)
    }

    /// Creates a bare edge with a generated id.
    pub fn create_edge(&mut self, outbound_id: Id, inbound_id: Id, label: Identifier) -> Result<Id> {
        self.create_edge_internal(None, outbound_id, inbound_id, label)
    }

    /// Creates a bare edge under a caller-chosen id.
    pub fn create_edge_with_id(&mut self, id: Id, outbound_id: Id, inbound_id: Id, label: Identifier) -> Result<Id> {
        self.create_edge_internal(Some(id), outbound_id, inbound_id, label)
    }

    /// Removes an edge from the primary store, both adjacency lists, the
    /// edge indices and the edge cache, then flips the tombstone.
    pub fn remove_edge(&mut self, id: Id) -> Result<()> {
        let (label, outbound_id, inbound_id, props) = {
            let edge = self.edges.get(&id).ok_or(Error::EdgeNotFound)?;
            edge.ensure_live()?;
            let props: Vec<(Identifier, Value)> =
                edge.properties().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            (edge.label().clone(), edge.outbound_id(), edge.inbound_id(), props)
        };

        if let Some(vertex) = self.vertices.get_mut(&outbound_id) {
            vertex.detach_edge(&label, id);
        }
        if let Some(vertex) = self.vertices.get_mut(&inbound_id) {
            vertex.detach_edge(&label, id);
        }

        for (key, value) in &props {
            self.edge_indices.key.auto_update(key, None, Some(value), id);
            self.edge_indices.range.remove(key, value, id);
        }
        self.edge_indices.composite.detach_element(id);

        {
            let mut cache = self.edge_cache.write().unwrap();
            cache.invalidate_element(id);
            for (key, _) in &props {
                cache.invalidate_key(key.as_str());
            }
        }

        if let Some(edge) = self.edges.get_mut(&id) {
            edge.removed = true;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Vertex properties
    // ------------------------------------------------------------------

    /// Inserts a vertex property, resolving the effective cardinality
    /// (explicit argument, else the key's recorded cardinality, else the
    /// graph default) and enforcing it. Returns the new property's id.
    pub fn add_vertex_property(
        &mut self,
        vertex_id: Id,
        key: &str,
        value: Value,
        cardinality: Option<Cardinality>,
        meta: Vec<(String, Value)>,
    ) -> Result<Id> {
        let key = validate_property_key(key)?;
        if value.is_null() && !self.config.allow_null_property_values {
            return Err(Error::NullValueNotAllowed);
        }

        let mut meta_props: Vec<(Identifier, Value)> = Vec::with_capacity(meta.len());
        for (meta_key, meta_value) in meta {
            let meta_key = validate_property_key(&meta_key)?;
            if meta_value.is_null() && !self.config.allow_null_property_values {
                return Err(Error::NullValueNotAllowed);
            }
            meta_props.push((meta_key, meta_value));
        }

        let effective = {
            let vertex = self.vertices.get(&vertex_id).ok_or(Error::VertexNotFound)?;
            vertex.ensure_live()?;
            vertex.effective_cardinality(&key, cardinality, self.config.default_vertex_property_cardinality)
        };
        self.property_manager
            .validate_features(&self.config, effective, !meta_props.is_empty())?;
        self.vertex_indices.range.check_insertable(&key, &value)?;

        let prop_id = self.property_ids.next_id();
        let mut prop = VertexProperty::new(prop_id, key.clone(), value.clone());
        for (meta_key, meta_value) in meta_props {
            prop.set_meta_property(meta_key, meta_value);
        }

        let outcome = self
            .vertices
            .get_mut(&vertex_id)
            .ok_or(Error::VertexNotFound)?
            .insert_property(prop, effective)?;
        self.apply_vertex_property_change(vertex_id, &key, Some(&value), &outcome.replaced)?;

        for (_, old) in &outcome.replaced {
            self.property_manager.notify(&PropertyEvent::Removed {
                vertex_id,
                key: key.clone(),
                value: old.clone(),
            });
        }
        self.property_manager.notify(&PropertyEvent::Added {
            vertex_id,
            key: key.clone(),
            value,
        });
        Ok(prop_id)
    }

    /// Attaches a meta-property to an existing vertex property.
    pub fn add_meta_property(&mut self, vertex_id: Id, property_id: Id, key: &str, value: Value) -> Result<()> {
        let key = validate_property_key(key)?;
        if value.is_null() && !self.config.allow_null_property_values {
            return Err(Error::NullValueNotAllowed);
        }
        if !self.config.supports_meta_properties {
            return Err(Error::MetaPropertyNotSupported);
        }
        let vertex = self.vertices.get_mut(&vertex_id).ok_or(Error::VertexNotFound)?;
        vertex.ensure_live()?;
        let prop = vertex.property_by_id_mut(property_id).ok_or(Error::ElementRemoved)?;
        if prop.is_removed() {
            return Err(Error::ElementRemoved);
        }
        prop.set_meta_property(key, value);
        Ok(())
    }

    /// Tombstones live properties for a key, optionally only those with a
    /// matching value. Returns how many were removed.
    pub fn remove_vertex_property(&mut self, vertex_id: Id, key: &str, value: Option<&Value>) -> Result<usize> {
        let key = validate_property_key(key)?;
        {
            let vertex = self.vertices.get(&vertex_id).ok_or(Error::VertexNotFound)?;
            vertex.ensure_live()?;
        }

        let removed = self
            .vertices
            .get_mut(&vertex_id)
            .ok_or(Error::VertexNotFound)?
            .remove_properties(&key, value);
        self.apply_vertex_property_change(vertex_id, &key, None, &removed)?;

        for (_, old) in &removed {
            self.property_manager.notify(&PropertyEvent::Removed {
                vertex_id,
                key: key.clone(),
                value: old.clone(),
            });
        }
        Ok(removed.len())
    }

    /// Tombstones every live property for a key.
    pub fn remove_vertex_properties(&mut self, vertex_id: Id, key: &str) -> Result<usize> {
        self.remove_vertex_property(vertex_id, key, None)
    }

    // ------------------------------------------------------------------
    // Edge properties
    // ------------------------------------------------------------------

    /// Sets an edge property, replacing any previous value.
    pub fn set_edge_property(&mut self, edge_id: Id, key: &str, value: Value) -> Result<()> {
        let key = validate_property_key(key)?;
        if value.is_null() && !self.config.allow_null_property_values {
            return Err(Error::NullValueNotAllowed);
        }
        {
            let edge = self.edges.get(&edge_id).ok_or(Error::EdgeNotFound)?;
            edge.ensure_live()?;
        }
        self.edge_indices.range.check_insertable(&key, &value)?;

        let old = self
            .edges
            .get_mut(&edge_id)
            .ok_or(Error::EdgeNotFound)?
            .set_property(key.clone(), value.clone());

        self.edge_indices.key.auto_update(&key, Some(&value), old.as_ref(), edge_id);
        if let Some(old) = &old {
            self.edge_indices.range.remove(&key, old, edge_id);
        }
        self.edge_indices.range.insert(&key, &value, edge_id)?;
        let edges = &self.edges;
        let value_of = |k: &Identifier| edges.get(&edge_id).and_then(|e| e.property(k)).cloned();
        self.edge_indices.composite.auto_update(&key, edge_id, &value_of);
        self.edge_cache.write().unwrap().invalidate_key(key.as_str());
        Ok(())
    }

    /// Removes an edge property, returning its previous value.
    pub fn remove_edge_property(&mut self, edge_id: Id, key: &str) -> Result<Option<Value>> {
        let key = validate_property_key(key)?;
        {
            let edge = self.edges.get(&edge_id).ok_or(Error::EdgeNotFound)?;
            edge.ensure_live()?;
        }

        let old = self
            .edges
            .get_mut(&edge_id)
            .ok_or(Error::EdgeNotFound)?
            .remove_property(&key);

        if let Some(old_value) = &old {
            self.edge_indices.key.auto_update(&key, None, Some(old_value), edge_id);
            self.edge_indices.range.remove(&key, old_value, edge_id);
            let edges = &self.edges;
            let value_of = |k: &Identifier| edges.get(&edge_id).and_then(|e| e.property(k)).cloned();
            self.edge_indices.composite.auto_update(&key, edge_id, &value_of);
            self.edge_cache.write().unwrap().invalidate_key(key.as_str());
        }
        Ok(old)
    }

    // ------------------------------------------------------------------
    // Index management
    // ------------------------------------------------------------------

    /// Creates a single-key index and builds it from the primary store.
    pub fn create_key_index(&mut self, key: Identifier, kind: ElementKind) -> bool {
        let created = match kind {
            ElementKind::Vertex => {
                let created = self.vertex_indices.key.create(key.clone());
                let scan = scan_vertex_values(&self.vertices, &key);
                self.vertex_indices.key.rebuild(&key, scan);
                created
            }
            ElementKind::Edge => {
                let created = self.edge_indices.key.create(key.clone());
                let scan = scan_edge_values(&self.edges, &key);
                self.edge_indices.key.rebuild(&key, scan);
                created
            }
        };
        self.invalidate_for_index_change(kind, &[key]);
        created
    }

    /// Drops a single-key index.
    pub fn drop_key_index(&mut self, key: &Identifier, kind: ElementKind) -> bool {
        let dropped = match kind {
            ElementKind::Vertex => self.vertex_indices.key.drop_key(key),
            ElementKind::Edge => self.edge_indices.key.drop_key(key),
        };
        self.invalidate_for_index_change(kind, std::slice::from_ref(key));
        dropped
    }

    /// Creates a composite index over an ordered key list and builds it
    /// from the primary store.
    pub fn create_composite_index(&mut self, keys: Vec<Identifier>, kind: ElementKind) -> Result<bool> {
        let created = match kind {
            ElementKind::Vertex => {
                let created = self.vertex_indices.composite.create(keys.clone())?;
                let scan = scan_vertex_tuples(&self.vertices, &keys);
                self.vertex_indices.composite.rebuild(&keys, scan);
                created
            }
            ElementKind::Edge => {
                let created = self.edge_indices.composite.create(keys.clone())?;
                let scan = scan_edge_tuples(&self.edges, &keys);
                self.edge_indices.composite.rebuild(&keys, scan);
                created
            }
        };
        self.invalidate_for_index_change(kind, &keys);
        Ok(created)
    }

    /// Drops a composite index.
    pub fn drop_composite_index(&mut self, keys: &[Identifier], kind: ElementKind) -> bool {
        let dropped = match kind {
            ElementKind::Vertex => self.vertex_indices.composite.drop_index(keys),
            ElementKind::Edge => self.edge_indices.composite.drop_index(keys),
        };
        self.invalidate_for_index_change(kind, keys);
        dropped
    }

    /// Creates a range index and builds it from the primary store.
    ///
    /// # Errors
    /// `NonComparableRangeValue` if the stored values under the key mix
    /// comparability classes; the index is not left behind in that case.
    pub fn create_range_index(&mut self, key: Identifier, kind: ElementKind) -> Result<bool> {
        let created = match kind {
            ElementKind::Vertex => {
                let created = self.vertex_indices.range.create(key.clone());
                let scan = scan_vertex_values(&self.vertices, &key);
                if let Err(err) = self.vertex_indices.range.rebuild(&key, scan) {
                    self.vertex_indices.range.drop_key(&key);
                    return Err(err);
                }
                created
            }
            ElementKind::Edge => {
                let created = self.edge_indices.range.create(key.clone());
                let scan = scan_edge_values(&self.edges, &key);
                if let Err(err) = self.edge_indices.range.rebuild(&key, scan) {
                    self.edge_indices.range.drop_key(&key);
                    return Err(err);
                }
                created
            }
        };
        self.invalidate_for_index_change(kind, &[key]);
        Ok(created)
    }

    /// Drops a range index.
    pub fn drop_range_index(&mut self, key: &Identifier, kind: ElementKind) -> bool {
        let dropped = match kind {
            ElementKind::Vertex => self.vertex_indices.range.drop_key(key),
            ElementKind::Edge => self.edge_indices.range.drop_key(key),
        };
        self.invalidate_for_index_change(kind, std::slice::from_ref(key));
        dropped
    }

    pub fn key_index_keys(&self, kind: ElementKind) -> Vec<Identifier> {
        self.indices_for(kind).key.indexed_keys()
    }

    pub fn composite_index_lists(&self, kind: ElementKind) -> Vec<Vec<Identifier>> {
        self.indices_for(kind).composite.indexed_lists()
    }

    pub fn range_index_keys(&self, kind: ElementKind) -> Vec<Identifier> {
        self.indices_for(kind).range.indexed_keys()
    }

    // ------------------------------------------------------------------
    // Cache and optimizer surface
    // ------------------------------------------------------------------

    pub fn cache_stats(&self, kind: ElementKind) -> CacheStats {
        self.cache_for(kind).read().unwrap().stats()
    }

    /// Tuning hints from the result cache.
    pub fn cache_recommendations(&self, kind: ElementKind) -> Vec<String> {
        self.cache_for(kind).read().unwrap().recommendations()
    }

    /// Sweeps expired entries from both result caches.
    pub fn cleanup_expired_cache(&self) -> usize {
        self.vertex_cache.write().unwrap().cleanup_expired() + self.edge_cache.write().unwrap().cleanup_expired()
    }

    /// Index suggestions derived from the recorded query patterns.
    pub fn index_recommendations(&self, kind: ElementKind) -> Vec<IndexRecommendation> {
        match kind {
            ElementKind::Vertex => self
                .vertex_optimizer
                .read()
                .unwrap()
                .recommendations(&self.vertex_indices),
            ElementKind::Edge => self.edge_optimizer.read().unwrap().recommendations(&self.edge_indices),
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Per-key cardinality statistics for one vertex.
    pub fn analyze_vertex(&self, id: Id) -> Result<BTreeMap<Identifier, CardinalityReport>> {
        let vertex = self.vertex(id)?;
        Ok(self.property_manager.analyze_cardinality(vertex))
    }

    /// Cardinality constraint breaches on one vertex.
    pub fn validate_vertex_constraints(&self, id: Id) -> Result<Vec<ConstraintViolation>> {
        let vertex = self.vertex(id)?;
        Ok(self.property_manager.validate_constraints(vertex))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn create_vertex_internal(&mut self, user_id: Option<Id>, label: Identifier) -> Result<Id> {
        let id = match user_id {
            Some(id) => {
                if self.vertices.contains_key(&id) {
                    return Err(Error::IdAlreadyExists);
                }
                self.vertex_ids.reserve(id);
                id
            }
            None => {
                let mut id = self.vertex_ids.next_id();
                while self.vertices.contains_key(&id) {
                    id = self.vertex_ids.next_id();
                }
                id
            }
        };
        self.vertices.insert(id, Vertex::new(id, label));
        Ok(id)
    }

    fn create_edge_internal(
        &mut self,
        user_id: Option<Id>,
        outbound_id: Id,
        inbound_id: Id,
        label: Identifier,
    ) -> Result<Id> {
        {
            let outbound = self.vertices.get(&outbound_id).ok_or(Error::VertexNotFound)?;
            outbound.ensure_live()?;
            let inbound = self.vertices.get(&inbound_id).ok_or(Error::VertexNotFound)?;
            inbound.ensure_live()?;
        }

        let id = match user_id {
            Some(id) => {
                if self.edges.contains_key(&id) {
                    return Err(Error::IdAlreadyExists);
                }
                self.edge_ids.reserve(id);
                id
            }
            None => {
                let mut id = self.edge_ids.next_id();
                while self.edges.contains_key(&id) {
                    id = self.edge_ids.next_id();
                }
                id
            }
        };

        self.edges.insert(id, Edge::new(id, label.clone(), outbound_id, inbound_id));
        self.vertices
            .get_mut(&outbound_id)
            .ok_or(Error::VertexNotFound)?
            .attach_out_edge(label.clone(), id);
        self.vertices
            .get_mut(&inbound_id)
            .ok_or(Error::VertexNotFound)?
            .attach_in_edge(label, id);
        Ok(id)
    }

    /// Pushes one vertex property change through the three vertex indices
    /// and the cache: removals detach, the addition attaches, and the
    /// composite index recomputes its tuples from the vertex's current
    /// state.
    fn apply_vertex_property_change(
        &mut self,
        vertex_id: Id,
        key: &Identifier,
        added: Option<&Value>,
        removed: &[(Id, Value)],
    ) -> Result<()> {
        for (_, value) in removed {
            self.vertex_indices.key.auto_update(key, None, Some(value), vertex_id);
            self.vertex_indices.range.remove(key, value, vertex_id);
        }
        if let Some(value) = added {
            self.vertex_indices.key.auto_update(key, Some(value), None, vertex_id);
            self.vertex_indices.range.insert(key, value, vertex_id)?;
        }

        let vertices = &self.vertices;
        let value_of = |k: &Identifier| vertices.get(&vertex_id).and_then(|v| v.value(k)).cloned();
        self.vertex_indices.composite.auto_update(key, vertex_id, &value_of);

        self.vertex_cache.write().unwrap().invalidate_key(key.as_str());
        Ok(())
    }

    fn invalidate_for_index_change(&self, kind: ElementKind, keys: &[Identifier]) {
        let cache = self.cache_for(kind);
        {
            let mut cache = cache.write().unwrap();
            for key in keys {
                cache.invalidate_key(key.as_str());
            }
        }
        match kind {
            ElementKind::Vertex => self.vertex_optimizer.write().unwrap().invalidate_statistics(),
            ElementKind::Edge => self.edge_optimizer.write().unwrap().invalidate_statistics(),
        }
    }

    /// Frees a tombstoned vertex's arena slot so its id can be reused.
    /// Only the codec's replace/merge policies do this; a live vertex is
    /// left alone.
    pub(crate) fn erase_tombstoned_vertex(&mut self, id: Id) -> bool {
        if self.vertices.get(&id).map_or(false, Vertex::is_removed) {
            self.vertices.remove(&id);
            true
        } else {
            false
        }
    }

    /// Frees a tombstoned edge's arena slot so its id can be reused.
    pub(crate) fn erase_tombstoned_edge(&mut self, id: Id) -> bool {
        if self.edges.get(&id).map_or(false, Edge::is_removed) {
            self.edges.remove(&id);
            true
        } else {
            false
        }
    }

    fn indices_for(&self, kind: ElementKind) -> &IndexSet {
        match kind {
            ElementKind::Vertex => &self.vertex_indices,
            ElementKind::Edge => &self.edge_indices,
        }
    }

    fn cache_for(&self, kind: ElementKind) -> &RwLock<IndexCache> {
        match kind {
            ElementKind::Vertex => &self.vertex_cache,
            ElementKind::Edge => &self.edge_cache,
        }
    }
}

fn validate_property_key(key: &str) -> Result<Identifier> {
    if is_reserved_key(key) {
        return Err(Error::InvalidPropertyKey);
    }
    Identifier::new(key).map_err(|_| Error::InvalidPropertyKey)
}

fn scan_vertex_values(vertices: &BTreeMap<Id, Vertex>, key: &Identifier) -> Vec<(Id, Vec<Value>)> {
    vertices
        .iter()
        .filter(|(_, v)| !v.is_removed())
        .map(|(id, v)| (*id, v.values(key).into_iter().cloned().collect()))
        .collect()
}

fn scan_vertex_tuples(vertices: &BTreeMap<Id, Vertex>, keys: &[Identifier]) -> Vec<(Id, Vec<Option<Value>>)> {
    vertices
        .iter()
        .filter(|(_, v)| !v.is_removed())
        .map(|(id, v)| (*id, keys.iter().map(|k| v.value(k).cloned()).collect()))
        .collect()
}

fn scan_edge_values(edges: &BTreeMap<Id, Edge>, key: &Identifier) -> Vec<(Id, Vec<Value>)> {
    edges
        .iter()
        .filter(|(_, e)| !e.is_removed())
        .map(|(id, e)| (*id, e.property(key).into_iter().cloned().collect()))
        .collect()
}

fn scan_edge_tuples(edges: &BTreeMap<Id, Edge>, keys: &[Identifier]) -> Vec<(Id, Vec<Option<Value>>)> {
    edges
        .iter()
        .filter(|(_, e)| !e.is_removed())
        .map(|(id, e)| (*id, keys.iter().map(|k| e.property(k).cloned()).collect()))
        .collect()
}
