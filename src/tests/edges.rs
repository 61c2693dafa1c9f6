use super::util::{add_person, ident, link};
use crate::{Direction, Error, Graph, Id, Value};

pub fn should_link_adjacency_on_edge_creation(graph: &mut Graph) {
    let alice = add_person(graph, "alice", 30, "NYC", "admin");
    let bob = add_person(graph, "bob", 25, "SFO", "user");

    let edge_id = graph
        .add_edge(alice, bob, ident("knows"), vec![("since".to_string(), Value::from(2019i64))])
        .unwrap();

    let edge = graph.edge(edge_id).unwrap();
    assert_eq!(edge.outbound_id(), alice);
    assert_eq!(edge.inbound_id(), bob);
    assert_eq!(edge.property(&ident("since")), Some(&Value::from(2019i64)));
    assert_eq!(edge.other_vertex_id(alice).unwrap(), bob);
    assert!(matches!(edge.other_vertex_id(Id(999)), Err(Error::VertexNotIncident)));

    // Both adjacency lists reference the edge
    assert_eq!(graph.vertex_edges(alice, Direction::Out, &[]).unwrap(), vec![edge_id]);
    assert_eq!(graph.vertex_edges(bob, Direction::In, &[]).unwrap(), vec![edge_id]);
    assert!(graph.vertex_edges(alice, Direction::In, &[]).unwrap().is_empty());
}

pub fn should_reject_edges_with_missing_endpoints(graph: &mut Graph) {
    let alice = add_person(graph, "alice", 30, "NYC", "admin");

    assert!(matches!(
        graph.create_edge(alice, Id(999), ident("knows")),
        Err(Error::VertexNotFound)
    ));
    assert!(matches!(
        graph.create_edge(Id(999), alice, ident("knows")),
        Err(Error::VertexNotFound)
    ));

    let bob = add_person(graph, "bob", 25, "SFO", "user");
    graph.remove_vertex(bob).unwrap();
    assert!(matches!(
        graph.create_edge(alice, bob, ident("knows")),
        Err(Error::ElementRemoved)
    ));
}

pub fn should_remove_edges_from_all_structures(graph: &mut Graph) {
    let alice = add_person(graph, "alice", 30, "NYC", "admin");
    let bob = add_person(graph, "bob", 25, "SFO", "user");
    let edge_id = link(graph, alice, bob, "knows");

    graph.remove_edge(edge_id).unwrap();

    assert_eq!(graph.edge_count(), 0);
    assert!(graph.vertex_edges(alice, Direction::Out, &[]).unwrap().is_empty());
    assert!(graph.vertex_edges(bob, Direction::In, &[]).unwrap().is_empty());
    // Both endpoints survive
    assert_eq!(graph.vertex_count(), 2);
}

pub fn should_expose_edge_weight(graph: &mut Graph) {
    let alice = add_person(graph, "alice", 30, "NYC", "admin");
    let bob = add_person(graph, "bob", 25, "SFO", "user");

    let plain = link(graph, alice, bob, "knows");
    assert_eq!(graph.edge(plain).unwrap().weight(), 1.0);

    let weighted = graph
        .add_edge(alice, bob, ident("knows"), vec![("weight".to_string(), Value::from(0.5f64))])
        .unwrap();
    assert_eq!(graph.edge(weighted).unwrap().weight(), 0.5);
}

pub fn should_set_and_remove_edge_properties(graph: &mut Graph) {
    let alice = add_person(graph, "alice", 30, "NYC", "admin");
    let bob = add_person(graph, "bob", 25, "SFO", "user");
    let edge_id = link(graph, alice, bob, "knows");

    graph.set_edge_property(edge_id, "since", Value::from(2019i64)).unwrap();
    graph.set_edge_property(edge_id, "since", Value::from(2020i64)).unwrap();
    assert_eq!(
        graph.edge(edge_id).unwrap().property(&ident("since")),
        Some(&Value::from(2020i64))
    );

    let old = graph.remove_edge_property(edge_id, "since").unwrap();
    assert_eq!(old, Some(Value::from(2020i64)));
    assert_eq!(graph.edge(edge_id).unwrap().property(&ident("since")), None);

    // Reserved and null-valued writes fail
    assert!(matches!(
        graph.set_edge_property(edge_id, "label", Value::from("x")),
        Err(Error::InvalidPropertyKey)
    ));
    assert!(matches!(
        graph.set_edge_property(edge_id, "since", Value::Null),
        Err(Error::NullValueNotAllowed)
    ));
}

pub fn should_reject_operations_on_removed_edges(graph: &mut Graph) {
    let alice = add_person(graph, "alice", 30, "NYC", "admin");
    let bob = add_person(graph, "bob", 25, "SFO", "user");
    let edge_id = link(graph, alice, bob, "knows");

    graph.remove_edge(edge_id).unwrap();

    assert!(matches!(graph.edge(edge_id), Err(Error::ElementRemoved)));
    assert!(matches!(
        graph.set_edge_property(edge_id, "since", Value::from(2019i64)),
        Err(Error::ElementRemoved)
    ));
    assert!(matches!(graph.remove_edge(edge_id), Err(Error::ElementRemoved)));
}
