//! Benchmarks over the in-memory engine. Requires nightly and the
//! `bench-suite` feature: `cargo +nightly bench --features bench-suite`.

use crate::{Criterion, ElementKind, Graph, Identifier, Value};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test::Bencher;

const POPULATION: usize = 1000;

fn populated_graph() -> Graph {
    let mut graph = Graph::default();
    let mut rng = StdRng::seed_from_u64(42);
    for n in 0..POPULATION {
        graph
            .add_vertex(vec![
                ("name".to_string(), Value::from(format!("v{}", n))),
                ("age".to_string(), Value::from(rng.gen_range(18i64..80))),
            ])
            .unwrap();
    }
    graph
}

#[bench]
fn bench_create_vertex(b: &mut Bencher) {
    let mut graph = Graph::default();
    let label = Identifier::new("person").unwrap();
    b.iter(|| {
        graph.create_vertex(label.clone()).unwrap();
    });
}

#[bench]
fn bench_create_edge(b: &mut Bencher) {
    let mut graph = Graph::default();
    let label = Identifier::new("knows").unwrap();
    let outbound = graph.create_vertex(label.clone()).unwrap();
    let inbound = graph.create_vertex(label.clone()).unwrap();
    b.iter(|| {
        graph.create_edge(outbound, inbound, label.clone()).unwrap();
    });
}

#[bench]
fn bench_add_vertex_property(b: &mut Bencher) {
    let mut graph = Graph::default();
    let id = graph.create_vertex(Identifier::new("person").unwrap()).unwrap();
    b.iter(|| {
        graph
            .add_vertex_property(id, "name", Value::from("alice"), None, Vec::new())
            .unwrap();
    });
}

#[bench]
fn bench_exact_query_indexed(b: &mut Bencher) {
    let mut graph = populated_graph();
    graph.create_key_index(Identifier::new("name").unwrap(), ElementKind::Vertex);
    let criteria = [Criterion::exact(Identifier::new("name").unwrap(), "v500")];
    b.iter(|| {
        graph.query_vertices(&criteria);
    });
}

#[bench]
fn bench_exact_query_scan(b: &mut Bencher) {
    let graph = populated_graph();
    let criteria = [Criterion::exact(Identifier::new("name").unwrap(), "v500")];
    b.iter(|| {
        graph.query_vertices(&criteria);
    });
}

#[bench]
fn bench_range_query_indexed(b: &mut Bencher) {
    let mut graph = populated_graph();
    graph
        .create_range_index(Identifier::new("age").unwrap(), ElementKind::Vertex)
        .unwrap();
    let criteria = [Criterion::range(
        Identifier::new("age").unwrap(),
        Some(Value::from(30i64)),
        Some(Value::from(40i64)),
    )];
    b.iter(|| {
        graph.query_vertices(&criteria);
    });
}
