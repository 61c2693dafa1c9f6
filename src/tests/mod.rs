//! A reusable test suite over a graph instance.
//!
//! Each test is a plain `pub fn` taking the graph to exercise, so
//! downstream crates embedding the engine can run the same suite against
//! their own construction (enable the `test-suite` feature). The
//! `full_test_impl!` macro expands to one `#[test]` wrapper per suite
//! function.

mod cache;
mod consistency;
mod edges;
mod optimizer;
pub mod util;

pub use cache::*;
pub use codec::*;
pub use consistency::*;
pub use edges::*;
pub use indexing::*;
pub use optimizer::*;
pub use properties::*;
pub use queries::*;
pub use vertices::*;

/// Defines a single test wrapper delegating to the suite function of the
/// same name.
#[macro_export]
macro_rules! define_test {
    ($name:ident, $code:expr) => {
        #[test]
        fn $name() {
            let mut graph = $code;
            $crate::tests::$name(&mut graph);
        }
    };
}

/// Expands to the full test suite against a graph constructor expression.
#[macro_export]
macro_rules! full_test_impl {
    ($code:expr) => {
        // Vertices
        $crate::define_test!(should_add_vertices_with_properties, $code);
        $crate::define_test!(should_reject_duplicate_vertex_ids, $code);
        $crate::define_test!(should_accept_user_supplied_vertex_ids, $code);
        $crate::define_test!(should_reject_reserved_property_keys, $code);
        $crate::define_test!(should_remove_vertices_transitively, $code);
        $crate::define_test!(should_reject_operations_on_removed_vertices, $code);
        $crate::define_test!(should_suppress_duplicate_neighbours_for_both, $code);
        $crate::define_test!(should_filter_adjacency_by_label, $code);

        // Edges
        $crate::define_test!(should_link_adjacency_on_edge_creation, $code);
        $crate::define_test!(should_reject_edges_with_missing_endpoints, $code);
        $crate::define_test!(should_remove_edges_from_all_structures, $code);
        $crate::define_test!(should_expose_edge_weight, $code);
        $crate::define_test!(should_set_and_remove_edge_properties, $code);
        $crate::define_test!(should_reject_operations_on_removed_edges, $code);

        // Vertex properties
        $crate::define_test!(should_replace_single_cardinality_values, $code);
        $crate::define_test!(should_reject_duplicate_set_values, $code);
        $crate::define_test!(should_append_list_values_in_order, $code);
        $crate::define_test!(should_inherit_recorded_cardinality, $code);
        $crate::define_test!(should_attach_meta_properties, $code);
        $crate::define_test!(should_reject_null_values_by_default, $code);
        $crate::define_test!(should_reject_invalid_property_keys, $code);
        $crate::define_test!(should_notify_property_listeners, $code);
        $crate::define_test!(should_report_cardinality_analysis, $code);
        $crate::define_test!(should_remove_properties_by_value, $code);

        // Indexing
        $crate::define_test!(should_maintain_key_index_through_mutations, $code);
        $crate::define_test!(should_build_key_index_from_existing_data, $code);
        $crate::define_test!(should_maintain_composite_index_through_mutations, $code);
        $crate::define_test!(should_keep_range_index_ordered, $code);
        $crate::define_test!(should_purge_indices_on_vertex_removal, $code);
        $crate::define_test!(should_index_edges_independently, $code);

        // Queries
        $crate::define_test!(should_answer_exact_queries_with_key_index, $code);
        $crate::define_test!(should_answer_range_queries_with_default_bounds, $code);
        $crate::define_test!(should_use_composite_index_for_conjunctions, $code);
        $crate::define_test!(should_fall_back_to_full_scan, $code);
        $crate::define_test!(should_apply_secondary_filters, $code);
        $crate::define_test!(should_evaluate_boolean_criterion_trees, $code);
        $crate::define_test!(should_aggregate_vertex_property_values, $code);
        $crate::define_test!(should_return_nothing_after_removal, $code);

        // Optimizer
        $crate::define_test!(should_plan_deterministically, $code);
        $crate::define_test!(should_recommend_indices_for_hot_patterns, $code);

        // Cache
        $crate::define_test!(should_cache_repeated_range_queries, $code);
        $crate::define_test!(should_invalidate_cache_on_mutation, $code);

        // Consistency
        $crate::define_test!(should_hold_invariants_under_random_mutations, $code);
        $crate::define_test!(should_clear_graph, $code);

        // Codec
        $crate::define_test!(should_round_trip_graph_records, $code);
        $crate::define_test!(should_reject_conflicting_ids_under_strict_policy, $code);
        $crate::define_test!(should_remap_ids_under_generate_new, $code);
        $crate::define_test!(should_merge_properties_into_existing_elements, $code);
        $crate::define_test!(should_replace_existing_elements, $code);
        $crate::define_test!(should_persist_images_through_storage_backends, $code);
    };
}
