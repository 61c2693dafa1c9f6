//! Builders shared by the suite.

use crate::{Graph, Id, Identifier, Value};

pub fn ident(s: &str) -> Identifier {
    Identifier::new(s).unwrap()
}

/// Adds a `person` vertex with the standard demographic properties.
pub fn add_person(graph: &mut Graph, name: &str, age: i64, city: &str, role: &str) -> Id {
    graph
        .add_vertex(vec![
            ("label".to_string(), Value::from("person")),
            ("name".to_string(), Value::from(name)),
            ("age".to_string(), Value::from(age)),
            ("city".to_string(), Value::from(city)),
            ("role".to_string(), Value::from(role)),
        ])
        .unwrap()
}

pub fn link(graph: &mut Graph, outbound: Id, inbound: Id, label: &str) -> Id {
    graph.create_edge(outbound, inbound, ident(label)).unwrap()
}

/// A small social graph: alice knows bob and carol, bob knows carol,
/// carol works-with alice. Returns `[alice, bob, carol]`.
pub fn people_fixture(graph: &mut Graph) -> [Id; 3] {
    let alice = add_person(graph, "alice", 30, "NYC", "admin");
    let bob = add_person(graph, "bob", 25, "SFO", "user");
    let carol = add_person(graph, "carol", 35, "NYC", "user");

    link(graph, alice, bob, "knows");
    link(graph, alice, carol, "knows");
    link(graph, bob, carol, "knows");
    link(graph, carol, alice, "works-with");

    [alice, bob, carol]
}
