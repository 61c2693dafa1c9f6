use super::util::{add_person, ident};
use crate::{Criterion, ElementKind, Graph, RecommendationKind, Strategy, Value};

pub fn should_plan_deterministically(graph: &mut Graph) {
    graph.create_key_index(ident("name"), ElementKind::Vertex);
    graph.create_key_index(ident("city"), ElementKind::Vertex);
    graph.create_range_index(ident("age"), ElementKind::Vertex).unwrap();

    for n in 0..20 {
        add_person(
            graph,
            &format!("p{}", n),
            20 + n as i64,
            if n % 2 == 0 { "NYC" } else { "SFO" },
            "user",
        );
    }

    let criteria = [
        Criterion::exact(ident("name"), "p3"),
        Criterion::exact(ident("city"), "SFO"),
        Criterion::range(ident("age"), Some(Value::from(20i64)), Some(Value::from(25i64))),
    ];

    let first = graph.explain_vertices(&criteria);
    for _ in 0..5 {
        assert_eq!(graph.explain_vertices(&criteria), first);
    }

    // An indexed range beats single-key lookups in the selection order
    assert!(matches!(&first.primary, Strategy::RangeIndex { key, .. } if key == &ident("age")));
    assert_eq!(first.secondary_filters.len(), 2);
}

pub fn should_recommend_indices_for_hot_patterns(graph: &mut Graph) {
    add_person(graph, "alice", 30, "NYC", "admin");

    let pair = [
        Criterion::exact(ident("city"), "NYC"),
        Criterion::exact(ident("role"), "admin"),
    ];
    let single = [Criterion::exact(ident("name"), "alice")];

    // Patterns only count as hot past the threshold
    for _ in 0..6 {
        graph.query_vertices(&pair);
    }
    for _ in 0..7 {
        graph.query_vertices(&single);
    }

    let recommendations = graph.index_recommendations(ElementKind::Vertex);
    assert_eq!(recommendations.len(), 2);

    // Priority equals the observed count, highest first
    assert_eq!(recommendations[0].kind, RecommendationKind::CreateSingle);
    assert_eq!(recommendations[0].keys, vec![ident("name")]);
    assert_eq!(recommendations[0].priority, 7);

    assert_eq!(recommendations[1].kind, RecommendationKind::CreateComposite);
    assert_eq!(recommendations[1].keys, vec![ident("city"), ident("role")]);
    assert_eq!(recommendations[1].priority, 6);

    let rendered = recommendations[1].to_string();
    assert!(rendered.contains("CREATE COMPOSITE"));
    assert!(rendered.contains("city"));

    // Creating the suggested indices silences the recommendations
    graph.create_key_index(ident("name"), ElementKind::Vertex);
    graph
        .create_composite_index(vec![ident("city"), ident("role")], ElementKind::Vertex)
        .unwrap();
    assert!(graph.index_recommendations(ElementKind::Vertex).is_empty());
}
