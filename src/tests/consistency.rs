//! Invariant checks under long random mutation sequences. The generator
//! is a fixed-seed LCG, so failures reproduce.

use super::util::ident;
use crate::{Cardinality, Direction, ElementKind, Error, Graph, Id, Value};

use std::collections::{HashMap, HashSet};

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[(self.next() as usize) % items.len()])
        }
    }
}

const NAMES: [&str; 6] = ["alice", "bob", "carol", "dave", "erin", "frank"];
const CITIES: [&str; 3] = ["NYC", "SFO", "LAX"];
const ROLES: [&str; 3] = ["admin", "user", "guest"];
const LANGS: [&str; 4] = ["en", "fr", "de", "pt"];

pub fn should_hold_invariants_under_random_mutations(graph: &mut Graph) {
    graph.create_key_index(ident("name"), ElementKind::Vertex);
    graph.create_range_index(ident("age"), ElementKind::Vertex).unwrap();
    graph
        .create_composite_index(vec![ident("city"), ident("role")], ElementKind::Vertex)
        .unwrap();

    let mut rng = Lcg(0x5eed);

    for step in 0..600 {
        let live: Vec<Id> = graph.vertices().map(|v| v.id()).collect();
        let live_edges: Vec<Id> = graph.edges().map(|e| e.id()).collect();

        match rng.next() % 10 {
            0 | 1 => {
                let name = *rng.pick(&NAMES).unwrap();
                let city = *rng.pick(&CITIES).unwrap();
                let role = *rng.pick(&ROLES).unwrap();
                let age = (rng.next() % 60) as i64 + 18;
                graph
                    .add_vertex(vec![
                        ("label".to_string(), Value::from("person")),
                        ("name".to_string(), Value::from(name)),
                        ("age".to_string(), Value::from(age)),
                        ("city".to_string(), Value::from(city)),
                        ("role".to_string(), Value::from(role)),
                    ])
                    .unwrap();
            }
            2 => {
                if let Some(id) = rng.pick(&live).copied() {
                    let lang = *rng.pick(&LANGS).unwrap();
                    match graph.add_vertex_property(id, "lang", Value::from(lang), Some(Cardinality::Set), Vec::new())
                    {
                        Ok(_) | Err(Error::DuplicateSetValue) => {}
                        Err(err) => panic!("unexpected failure adding set value: {}", err),
                    }
                }
            }
            3 => {
                if let Some(id) = rng.pick(&live).copied() {
                    let tag = (rng.next() % 4).to_string();
                    graph
                        .add_vertex_property(id, "tag", Value::from(tag), Some(Cardinality::List), Vec::new())
                        .unwrap();
                }
            }
            4 => {
                if let Some(id) = rng.pick(&live).copied() {
                    let age = (rng.next() % 60) as i64 + 18;
                    graph
                        .add_vertex_property(id, "age", Value::from(age), None, Vec::new())
                        .unwrap();
                }
            }
            5 => {
                if let Some(id) = rng.pick(&live).copied() {
                    let lang = *rng.pick(&LANGS).unwrap();
                    graph
                        .remove_vertex_property(id, "lang", Some(&Value::from(lang)))
                        .unwrap();
                }
            }
            6 | 7 => {
                if live.len() >= 2 {
                    let out = rng.pick(&live).copied().unwrap();
                    let inn = rng.pick(&live).copied().unwrap();
                    graph.create_edge(out, inn, ident("knows")).unwrap();
                }
            }
            8 => {
                if let Some(id) = rng.pick(&live_edges).copied() {
                    graph.remove_edge(id).unwrap();
                }
            }
            _ => {
                if let Some(id) = rng.pick(&live).copied() {
                    graph.remove_vertex(id).unwrap();
                }
            }
        }

        if step % 25 == 0 {
            check_invariants(graph);
        }
    }

    check_invariants(graph);
}

fn check_invariants(graph: &Graph) {
    check_adjacency(graph);
    check_key_index_fidelity(graph);
    check_composite_fidelity(graph);
    check_range_fidelity(graph);
    check_cardinality_discipline(graph);
}

fn check_adjacency(graph: &Graph) {
    for edge in graph.edges() {
        let out = graph.vertex(edge.outbound_id()).unwrap();
        assert!(
            out.edge_ids(Direction::Out, &[]).contains(&edge.id()),
            "edge {} missing from outbound adjacency",
            edge.id()
        );
        let inbound = graph.vertex(edge.inbound_id()).unwrap();
        assert!(
            inbound.edge_ids(Direction::In, &[]).contains(&edge.id()),
            "edge {} missing from inbound adjacency",
            edge.id()
        );
    }
    for vertex in graph.vertices() {
        for direction in [Direction::Out, Direction::In] {
            for edge_id in vertex.edge_ids(direction, &[]) {
                let edge = graph.edge(edge_id).unwrap();
                let endpoint = match direction {
                    Direction::Out => edge.outbound_id(),
                    _ => edge.inbound_id(),
                };
                assert_eq!(endpoint, vertex.id(), "adjacency points at a foreign edge");
            }
        }
    }
}

fn check_key_index_fidelity(graph: &Graph) {
    let name = ident("name");
    let mut expected: HashMap<Value, HashSet<Id>> = HashMap::new();
    for vertex in graph.vertices() {
        for value in vertex.values(&name) {
            expected.entry(value.clone()).or_default().insert(vertex.id());
        }
    }
    for (value, ids) in &expected {
        assert_eq!(&graph.vertex_indices.key.get(&name, value), ids);
    }
    assert_eq!(graph.vertex_indices.key.distinct_values(&name), expected.len());
}

fn check_composite_fidelity(graph: &Graph) {
    let keys = [ident("city"), ident("role")];
    let mut expected: HashMap<Vec<Value>, HashSet<Id>> = HashMap::new();
    for vertex in graph.vertices() {
        let tuple: Option<Vec<Value>> = keys.iter().map(|k| vertex.value(k).cloned()).collect();
        if let Some(tuple) = tuple {
            expected.entry(tuple).or_default().insert(vertex.id());
        }
    }
    for (tuple, ids) in &expected {
        assert_eq!(&graph.vertex_indices.composite.get(&keys, tuple).unwrap(), ids);
    }
    // A tuple no live vertex carries must be empty
    let absent = [Value::from("nowhere"), Value::from("nobody")];
    assert!(graph.vertex_indices.composite.get(&keys, &absent).unwrap().is_empty());
}

fn check_range_fidelity(graph: &Graph) {
    let age = ident("age");
    let mut expected: HashSet<Id> = HashSet::new();
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    for vertex in graph.vertices() {
        for value in vertex.values(&age) {
            if let Some(x) = value.as_f64() {
                expected.insert(vertex.id());
                min = Some(min.map_or(x, |m: f64| m.min(x)));
                max = Some(max.map_or(x, |m: f64| m.max(x)));
            }
        }
    }

    let all = graph.vertex_indices.range.range_query(&age, None, None, true, false);
    assert_eq!(all, expected);
    assert_eq!(
        graph.vertex_indices.range.min_value(&age).and_then(Value::as_f64),
        min
    );
    assert_eq!(
        graph.vertex_indices.range.max_value(&age).and_then(Value::as_f64),
        max
    );
}

fn check_cardinality_discipline(graph: &Graph) {
    for vertex in graph.vertices() {
        for key in vertex.property_keys() {
            let values = vertex.values(key);
            match vertex.cardinality(key) {
                Some(Cardinality::Single) => {
                    assert!(values.len() <= 1, "single key '{}' holds {} values", key, values.len())
                }
                Some(Cardinality::Set) => {
                    let distinct: HashSet<&&Value> = values.iter().collect();
                    assert_eq!(distinct.len(), values.len(), "set key '{}' holds duplicates", key);
                }
                Some(Cardinality::List) => {}
                None => panic!("live key '{}' lost its cardinality entry", key),
            }
        }
    }
}

pub fn should_clear_graph(graph: &mut Graph) {
    graph.create_key_index(ident("name"), ElementKind::Vertex);
    let alice = graph
        .add_vertex(vec![("name".to_string(), Value::from("alice"))])
        .unwrap();
    let bob = graph
        .add_vertex(vec![("name".to_string(), Value::from("bob"))])
        .unwrap();
    graph.create_edge(alice, bob, ident("knows")).unwrap();
    graph.set_variable("creator", Value::from("tests")).unwrap();

    graph.clear();

    assert_eq!(graph.vertex_count(), 0);
    assert_eq!(graph.edge_count(), 0);
    assert!(graph.variables().is_empty());
    assert!(graph.key_index_keys(ElementKind::Vertex).is_empty());
    // Allocators restart from scratch
    let fresh = graph.add_vertex(vec![("name".to_string(), Value::from("carol"))]).unwrap();
    assert_eq!(fresh, Id(1));
}
