use super::util::{add_person, ident};
use crate::{Criterion, ElementKind, Graph, Value};

pub fn should_cache_repeated_range_queries(graph: &mut Graph) {
    graph.create_range_index(ident("age"), ElementKind::Vertex).unwrap();
    for age in [20i64, 30, 40] {
        add_person(graph, &format!("p{}", age), age, "NYC", "user");
    }

    let criteria = [Criterion::range(
        ident("age"),
        Some(Value::from(25i64)),
        Some(Value::from(45i64)),
    )];

    let first = graph.query_vertices(&criteria);
    assert_eq!(first.len(), 2);
    let after_miss = graph.cache_stats(ElementKind::Vertex);
    assert_eq!(after_miss.misses, 1);
    assert_eq!(after_miss.hits, 0);

    // The repeat is served from the cache and returns the same ids
    let second = graph.query_vertices(&criteria);
    assert_eq!(second, first);
    let after_hit = graph.cache_stats(ElementKind::Vertex);
    assert_eq!(after_hit.hits, 1);

    // A different interval is its own entry
    graph.query_vertices(&[Criterion::range(
        ident("age"),
        Some(Value::from(25i64)),
        Some(Value::from(35i64)),
    )]);
    assert_eq!(graph.cache_stats(ElementKind::Vertex).misses, 2);

    assert_eq!(graph.cleanup_expired_cache(), 0);
}

pub fn should_invalidate_cache_on_mutation(graph: &mut Graph) {
    graph.create_range_index(ident("age"), ElementKind::Vertex).unwrap();
    let alice = add_person(graph, "alice", 30, "NYC", "user");
    let bob = add_person(graph, "bob", 40, "NYC", "user");

    let criteria = [Criterion::range(
        ident("age"),
        Some(Value::from(25i64)),
        Some(Value::from(50i64)),
    )];
    assert_eq!(graph.query_vertices(&criteria), vec![alice, bob]);

    // A property write on the cached key drops the stale entry
    graph
        .add_vertex_property(bob, "age", Value::from(60i64), None, Vec::new())
        .unwrap();
    assert_eq!(graph.query_vertices(&criteria), vec![alice]);

    // Element removal scrubs every entry containing it
    assert_eq!(graph.query_vertices(&criteria), vec![alice]);
    graph.remove_vertex(alice).unwrap();
    assert!(graph.query_vertices(&criteria).is_empty());
}
