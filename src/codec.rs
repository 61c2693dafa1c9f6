//! A neutral record codec for external serializers.
//!
//! A codec (GraphSON, a test fixture, the snapshot image below) sees the
//! graph as a fixed visit order: one header, every vertex, every edge,
//! then the graph variables. Reading mirrors that order and applies one of
//! four id conflict policies.

use std::collections::{BTreeMap, HashMap};

use crate::errors::{Error, Result};
use crate::graph::{Config, Graph};
use crate::models::{Cardinality, Edge, Id, Identifier, Value, Vertex};
use crate::storage::StorageBackend;
use crate::util::now_millis;

use serde::{Deserialize, Serialize};

pub const CODEC_VERSION: &str = "1.0";

/// Leading metadata of a serialized graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphHeader {
    pub version: String,
    pub timestamp_ms: u64,
}

impl Default for GraphHeader {
    fn default() -> Self {
        Self {
            version: CODEC_VERSION.to_string(),
            timestamp_ms: 0,
        }
    }
}

/// One vertex property as a codec sees it: the value plus its
/// meta-properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub value: Value,
    pub meta: Vec<(String, Value)>,
}

/// A vertex in visit order: properties are grouped per key, each key
/// carrying its ordered list of property records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: Id,
    pub label: String,
    pub properties: Vec<(String, Vec<PropertyRecord>)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: Id,
    pub label: String,
    pub outbound_id: Id,
    pub inbound_id: Id,
    pub properties: Vec<(String, Value)>,
}

/// What a codec implements to receive a graph, in visit order.
pub trait GraphVisitor {
    fn visit_header(&mut self, header: &GraphHeader) -> Result<()>;
    fn visit_vertex(&mut self, vertex: &VertexRecord) -> Result<()>;
    fn visit_edge(&mut self, edge: &EdgeRecord) -> Result<()>;
    fn visit_variables(&mut self, variables: &BTreeMap<String, Value>) -> Result<()>;
}

/// What a codec implements to feed a graph, mirroring the visit order.
pub trait RecordSource {
    fn read_header(&mut self) -> Result<GraphHeader>;
    fn next_vertex(&mut self) -> Result<Option<VertexRecord>>;
    fn next_edge(&mut self) -> Result<Option<EdgeRecord>>;
    fn read_variables(&mut self) -> Result<BTreeMap<String, Value>>;
}

/// How `read_graph` treats an incoming id that is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// Fail with `IdAlreadyExists`.
    Strict,
    /// Give every incoming element a fresh id, rewiring edge endpoints
    /// through the remap table.
    GenerateNew,
    /// Keep the existing element and overwrite the conflicting property
    /// values.
    MergeProperties,
    /// Remove the existing element (and, for a vertex, its incident
    /// edges), then create the incoming one under the same id.
    ReplaceElement,
}

/// Feeds an entire graph to a visitor.
pub fn write_graph<V: GraphVisitor>(graph: &Graph, visitor: &mut V) -> Result<()> {
    visitor.visit_header(&GraphHeader {
        version: CODEC_VERSION.to_string(),
        timestamp_ms: now_millis(),
    })?;
    for vertex in graph.vertices() {
        visitor.visit_vertex(&vertex_record(vertex))?;
    }
    for edge in graph.edges() {
        visitor.visit_edge(&edge_record(edge))?;
    }
    visitor.visit_variables(graph.variables())
}

/// Builds a graph up from a record source under an id policy.
pub fn read_graph<S: RecordSource>(source: &mut S, graph: &mut Graph, policy: IdPolicy) -> Result<()> {
    let header = source.read_header()?;
    log::debug!("reading graph records, image version {}", header.version);

    let mut remap: HashMap<Id, Id> = HashMap::new();
    while let Some(record) = source.next_vertex()? {
        read_vertex(graph, record, policy, &mut remap)?;
    }
    while let Some(record) = source.next_edge()? {
        read_edge(graph, record, policy, &remap)?;
    }
    for (key, value) in source.read_variables()? {
        graph.set_variable(key, value)?;
    }
    Ok(())
}

fn vertex_record(vertex: &Vertex) -> VertexRecord {
    let mut properties = Vec::new();
    for key in vertex.property_keys() {
        let records: Vec<PropertyRecord> = vertex
            .vertex_properties(key)
            .into_iter()
            .map(|p| PropertyRecord {
                value: p.value().clone(),
                meta: p
                    .meta_properties()
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            })
            .collect();
        properties.push((key.to_string(), records));
    }
    VertexRecord {
        id: vertex.id(),
        label: vertex.label().to_string(),
        properties,
    }
}

fn edge_record(edge: &Edge) -> EdgeRecord {
    EdgeRecord {
        id: edge.id(),
        label: edge.label().to_string(),
        outbound_id: edge.outbound_id(),
        inbound_id: edge.inbound_id(),
        properties: edge
            .properties()
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    }
}

fn parse_label(label: &str) -> Result<Identifier> {
    Identifier::new(label).map_err(|err| Error::MalformedExternalInput(format!("bad label '{}': {}", label, err)))
}

fn read_vertex(graph: &mut Graph, record: VertexRecord, policy: IdPolicy, remap: &mut HashMap<Id, Id>) -> Result<()> {
    let label = parse_label(&record.label)?;

    match policy {
        IdPolicy::Strict => {
            if graph.vertices.contains_key(&record.id) {
                return Err(Error::IdAlreadyExists);
            }
            let id = graph.create_vertex_with_id(record.id, label)?;
            attach_vertex_properties(graph, id, &record, false)
        }
        IdPolicy::GenerateNew => {
            let id = graph.create_vertex(label)?;
            remap.insert(record.id, id);
            attach_vertex_properties(graph, id, &record, false)
        }
        IdPolicy::MergeProperties => {
            if graph.contains_vertex(record.id) {
                attach_vertex_properties(graph, record.id, &record, true)
            } else {
                graph.erase_tombstoned_vertex(record.id);
                let id = graph.create_vertex_with_id(record.id, label)?;
                attach_vertex_properties(graph, id, &record, false)
            }
        }
        IdPolicy::ReplaceElement => {
            if graph.contains_vertex(record.id) {
                graph.remove_vertex(record.id)?;
            }
            graph.erase_tombstoned_vertex(record.id);
            let id = graph.create_vertex_with_id(record.id, label)?;
            attach_vertex_properties(graph, id, &record, false)
        }
    }
}

fn attach_vertex_properties(graph: &mut Graph, id: Id, record: &VertexRecord, overwrite: bool) -> Result<()> {
    for (key, records) in &record.properties {
        if overwrite {
            graph.remove_vertex_properties(id, key)?;
        }
        // More than one record per key forces a multi-cardinality; a lone
        // record defers to the target graph's default.
        let cardinality = if records.len() > 1 { Some(Cardinality::List) } else { None };
        for prop in records {
            graph.add_vertex_property(id, key, prop.value.clone(), cardinality, prop.meta.clone())?;
        }
    }
    Ok(())
}

fn read_edge(graph: &mut Graph, record: EdgeRecord, policy: IdPolicy, remap: &HashMap<Id, Id>) -> Result<()> {
    let label = parse_label(&record.label)?;
    let outbound_id = remap.get(&record.outbound_id).copied().unwrap_or(record.outbound_id);
    let inbound_id = remap.get(&record.inbound_id).copied().unwrap_or(record.inbound_id);

    let id = match policy {
        IdPolicy::Strict => {
            if graph.edges.contains_key(&record.id) {
                return Err(Error::IdAlreadyExists);
            }
            graph.create_edge_with_id(record.id, outbound_id, inbound_id, label)?
        }
        IdPolicy::GenerateNew => graph.create_edge(outbound_id, inbound_id, label)?,
        IdPolicy::MergeProperties => {
            if graph.contains_edge(record.id) {
                record.id
            } else {
                graph.erase_tombstoned_edge(record.id);
                graph.create_edge_with_id(record.id, outbound_id, inbound_id, label)?
            }
        }
        IdPolicy::ReplaceElement => {
            if graph.contains_edge(record.id) {
                graph.remove_edge(record.id)?;
            }
            graph.erase_tombstoned_edge(record.id);
            graph.create_edge_with_id(record.id, outbound_id, inbound_id, label)?
        }
    };

    for (key, value) in &record.properties {
        graph.set_edge_property(id, key, value.clone())?;
    }
    Ok(())
}

/// A materialized graph serialization: the record streams a visitor
/// receives, held as plain data. This is both the in-crate snapshot format
/// (encoded with MessagePack) and a convenient fixture for codec tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphImage {
    pub header: GraphHeader,
    pub vertices: Vec<VertexRecord>,
    pub edges: Vec<EdgeRecord>,
    pub variables: BTreeMap<String, Value>,
}

impl GraphImage {
    /// Snapshots a graph into records.
    pub fn capture(graph: &Graph) -> Result<Self> {
        let mut image = GraphImage::default();
        write_graph(graph, &mut image)?;
        Ok(image)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|err| Error::MalformedExternalInput(err.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|err| Error::MalformedExternalInput(err.to_string()))
    }

    /// Consumes the image into a record source for `read_graph`.
    pub fn into_reader(self) -> GraphImageReader {
        GraphImageReader {
            header: self.header,
            vertices: self.vertices.into_iter(),
            edges: self.edges.into_iter(),
            variables: self.variables,
        }
    }
}

impl GraphVisitor for GraphImage {
    fn visit_header(&mut self, header: &GraphHeader) -> Result<()> {
        self.header = header.clone();
        Ok(())
    }

    fn visit_vertex(&mut self, vertex: &VertexRecord) -> Result<()> {
        self.vertices.push(vertex.clone());
        Ok(())
    }

    fn visit_edge(&mut self, edge: &EdgeRecord) -> Result<()> {
        self.edges.push(edge.clone());
        Ok(())
    }

    fn visit_variables(&mut self, variables: &BTreeMap<String, Value>) -> Result<()> {
        self.variables = variables.clone();
        Ok(())
    }
}

/// `RecordSource` over a consumed `GraphImage`.
pub struct GraphImageReader {
    header: GraphHeader,
    vertices: std::vec::IntoIter<VertexRecord>,
    edges: std::vec::IntoIter<EdgeRecord>,
    variables: BTreeMap<String, Value>,
}

impl RecordSource for GraphImageReader {
    fn read_header(&mut self) -> Result<GraphHeader> {
        Ok(self.header.clone())
    }

    fn next_vertex(&mut self) -> Result<Option<VertexRecord>> {
        Ok(self.vertices.next())
    }

    fn next_edge(&mut self) -> Result<Option<EdgeRecord>> {
        Ok(self.edges.next())
    }

    fn read_variables(&mut self) -> Result<BTreeMap<String, Value>> {
        Ok(std::mem::take(&mut self.variables))
    }
}

impl Graph {
    /// Serializes the graph as a MessagePack image into a storage backend.
    pub fn save_image(&self, backend: &mut dyn StorageBackend, key: &str) -> Result<()> {
        let image = GraphImage::capture(self)?;
        backend.store(key, &image.to_bytes()?)
    }

    /// Loads a graph from a MessagePack image stored in a backend.
    pub fn load_image(backend: &dyn StorageBackend, key: &str, config: Config) -> Result<Graph> {
        let bytes = backend
            .load(key)?
            .ok_or_else(|| Error::MalformedExternalInput(format!("no graph image under key '{}'", key)))?;
        let image = GraphImage::from_bytes(&bytes)?;
        let mut graph = Graph::new(config);
        read_graph(&mut image.into_reader(), &mut graph, IdPolicy::Strict)?;
        Ok(graph)
    }
}
