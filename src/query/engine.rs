use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use crate::graph::Graph;
use crate::indices::{CacheKey, IndexCache, IndexKind, IndexSet};
use crate::models::{Element, Id, Identifier, Propertied, Value};
use crate::query::criteria::RegexCache;
use crate::query::{CompositeOp, Criterion, Optimizer, QueryPlan, Strategy};

/// An aggregation over the live values of one property key. Numeric ops
/// coerce to f64 and ignore non-numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Count,
    DistinctCount,
    Min,
    Max,
    Sum,
    Average,
}

/// Evaluates a criterion against one element's live property values.
///
/// Shape mismatches never raise: a range over strings, a regex over
/// numbers, or a malformed pattern all contribute false.
pub(crate) fn evaluate<E: Propertied>(element: &E, criterion: &Criterion, regexes: &RegexCache) -> bool {
    match criterion {
        Criterion::Exact { key, value } => element.live_values(key).into_iter().any(|v| v == value),
        Criterion::Range {
            key,
            min,
            max,
            include_min,
            include_max,
        } => {
            let min_bound = match min {
                Some(v) => match v.as_f64() {
                    Some(x) => Some(x),
                    None => return false,
                },
                None => None,
            };
            let max_bound = match max {
                Some(v) => match v.as_f64() {
                    Some(x) => Some(x),
                    None => return false,
                },
                None => None,
            };
            element
                .live_values(key)
                .into_iter()
                .filter_map(Value::as_f64)
                .any(|x| {
                    let above = min_bound.map_or(true, |m| if *include_min { x >= m } else { x > m });
                    let below = max_bound.map_or(true, |m| if *include_max { x <= m } else { x < m });
                    above && below
                })
        }
        Criterion::Exists { key } => element.has_live_value(key),
        Criterion::NotExists { key } => !element.has_live_value(key),
        Criterion::Contains {
            key,
            substring,
            element: needle,
            ignore_case,
        } => element.live_values(key).into_iter().any(|v| match v {
            Value::Str(s) => substring.as_ref().map_or(false, |sub| {
                if *ignore_case {
                    s.to_lowercase().contains(&sub.to_lowercase())
                } else {
                    s.contains(sub.as_str())
                }
            }),
            Value::List(items) | Value::Set(items) => needle.as_ref().map_or(false, |n| items.contains(n)),
            _ => false,
        }),
        Criterion::Regex { key, pattern } => element
            .live_values(key)
            .into_iter()
            .any(|v| v.as_str().map_or(false, |s| regexes.is_full_match(pattern, s))),
        Criterion::Composite { op, children } => match op {
            CompositeOp::And => children.iter().all(|c| evaluate(element, c, regexes)),
            CompositeOp::Or => children.iter().any(|c| evaluate(element, c, regexes)),
            CompositeOp::Not => children.len() == 1 && !evaluate(element, &children[0], regexes),
        },
    }
}

fn range_cache_key(
    key: &Identifier,
    min: Option<&Value>,
    max: Option<&Value>,
    include_min: bool,
    include_max: bool,
) -> CacheKey {
    CacheKey::new(IndexKind::Range, key.as_str())
        .with_param("min", min.cloned().unwrap_or(Value::Null))
        .with_param("max", max.cloned().unwrap_or(Value::Null))
        .with_param("include_min", Value::Bool(include_min))
        .with_param("include_max", Value::Bool(include_max))
}

/// Runs a criterion list against one element class: the single-range fast
/// path consults the cache, everything else goes plan → candidate set →
/// secondary filter scan. Results come back sorted by id.
pub(crate) fn run_query<E: Element + Propertied>(
    elements: &BTreeMap<Id, E>,
    indices: &IndexSet,
    cache: &RwLock<IndexCache>,
    optimizer: &RwLock<Optimizer>,
    regexes: &RegexCache,
    criteria: &[Criterion],
) -> Vec<Id> {
    if let [Criterion::Range {
        key,
        min,
        max,
        include_min,
        include_max,
    }] = criteria
    {
        if indices.range.is_indexed(key) {
            let cache_key = range_cache_key(key, min.as_ref(), max.as_ref(), *include_min, *include_max);
            if let Some(ids) = cache.write().unwrap().get(&cache_key) {
                return sorted(ids);
            }
            let ids = indices
                .range
                .range_query(key, min.as_ref(), max.as_ref(), *include_min, *include_max);
            cache.write().unwrap().put(cache_key, ids.clone());
            return sorted(ids);
        }
    }

    let plan = optimizer.write().unwrap().plan(criteria, indices);

    let candidates: Vec<Id> = match &plan.primary {
        Strategy::CompositeIndex { keys, criteria: matching } => {
            let tuple: Vec<Value> = keys
                .iter()
                .map(|k| {
                    matching
                        .iter()
                        .find_map(|c| match c {
                            Criterion::Exact { key, value } if key == k => Some(value.clone()),
                            _ => None,
                        })
                        .unwrap_or(Value::Null)
                })
                .collect();
            indices
                .composite
                .get(keys, &tuple)
                .unwrap_or_default()
                .into_iter()
                .collect()
        }
        Strategy::RangeIndex { key, criterion } => match criterion {
            Criterion::Range {
                min,
                max,
                include_min,
                include_max,
                ..
            } => indices
                .range
                .range_query(key, min.as_ref(), max.as_ref(), *include_min, *include_max)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        },
        Strategy::KeyIndex { key } => {
            let value = criteria.iter().find_map(|c| match c {
                Criterion::Exact { key: k, value } if k == key => Some(value.clone()),
                _ => None,
            });
            match value {
                Some(value) => indices.key.get(key, &value).into_iter().collect(),
                None => Vec::new(),
            }
        }
        Strategy::FullScan { criteria: all } => elements
            .values()
            .filter(|e| !e.is_removed())
            .filter(|e| all.iter().all(|c| evaluate(*e, c, regexes)))
            .map(|e| e.id())
            .collect(),
    };

    let mut ids: Vec<Id> = candidates
        .into_iter()
        .filter(|id| match elements.get(id) {
            Some(e) if !e.is_removed() => plan.secondary_filters.iter().all(|c| evaluate(e, c, regexes)),
            _ => false,
        })
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

fn sorted(ids: HashSet<Id>) -> Vec<Id> {
    let mut ids: Vec<Id> = ids.into_iter().collect();
    ids.sort();
    ids
}

/// Folds a value stream into a single aggregate. `None` means the op had
/// nothing to work with (e.g. a minimum over no numeric values).
pub(crate) fn aggregate<'a, I>(values: I, op: AggregateOp) -> Option<f64>
where
    I: Iterator<Item = &'a Value>,
{
    match op {
        AggregateOp::Count => Some(values.count() as f64),
        AggregateOp::DistinctCount => {
            let distinct: HashSet<&Value> = values.collect();
            Some(distinct.len() as f64)
        }
        AggregateOp::Min => values
            .filter_map(Value::as_f64)
            .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |a| a.min(x)))),
        AggregateOp::Max => values
            .filter_map(Value::as_f64)
            .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |a| a.max(x)))),
        AggregateOp::Sum => Some(values.filter_map(Value::as_f64).sum()),
        AggregateOp::Average => {
            let mut sum = 0.0;
            let mut count = 0usize;
            for x in values.filter_map(Value::as_f64) {
                sum += x;
                count += 1;
            }
            if count == 0 {
                None
            } else {
                Some(sum / count as f64)
            }
        }
    }
}

impl Graph {
    /// Ids of the live vertices matching every criterion, ascending.
    pub fn query_vertices(&self, criteria: &[Criterion]) -> Vec<Id> {
        run_query(
            &self.vertices,
            &self.vertex_indices,
            &self.vertex_cache,
            &self.vertex_optimizer,
            &self.regexes,
            criteria,
        )
    }

    /// Ids of the live edges matching every criterion, ascending.
    pub fn query_edges(&self, criteria: &[Criterion]) -> Vec<Id> {
        run_query(
            &self.edges,
            &self.edge_indices,
            &self.edge_cache,
            &self.edge_optimizer,
            &self.regexes,
            criteria,
        )
    }

    /// The plan the optimizer would pick for a vertex query, without
    /// running it.
    pub fn explain_vertices(&self, criteria: &[Criterion]) -> QueryPlan {
        self.vertex_optimizer
            .write()
            .unwrap()
            .plan(criteria, &self.vertex_indices)
    }

    /// The plan the optimizer would pick for an edge query.
    pub fn explain_edges(&self, criteria: &[Criterion]) -> QueryPlan {
        self.edge_optimizer
            .write()
            .unwrap()
            .plan(criteria, &self.edge_indices)
    }

    /// Aggregates the live values of a vertex property key across the
    /// whole graph.
    pub fn aggregate_vertex_property(&self, key: &Identifier, op: AggregateOp) -> Option<f64> {
        let values = self
            .vertices
            .values()
            .filter(|v| !v.is_removed())
            .flat_map(|v| v.values(key));
        aggregate(values, op)
    }
}

#[cfg(test)]
mod tests {
    use super::{aggregate, evaluate, AggregateOp};
    use crate::models::{Cardinality, Id, Identifier, Value, Vertex, VertexProperty};
    use crate::query::criteria::RegexCache;
    use crate::query::Criterion;

    fn ident(s: &str) -> Identifier {
        Identifier::new(s).unwrap()
    }

    fn vertex_with(props: Vec<(&str, Value)>) -> Vertex {
        let mut v = Vertex::new(Id(1), ident("person"));
        for (n, (key, value)) in props.into_iter().enumerate() {
            v.insert_property(
                VertexProperty::new(Id(100 + n as u64), ident(key), value),
                Cardinality::List,
            )
            .unwrap();
        }
        v
    }

    #[test]
    fn should_evaluate_exact_and_range() {
        let v = vertex_with(vec![("name", Value::from("alice")), ("age", Value::from(30i64))]);
        let regexes = RegexCache::default();

        assert!(evaluate(&v, &Criterion::exact(ident("name"), "alice"), &regexes));
        assert!(!evaluate(&v, &Criterion::exact(ident("name"), "bob"), &regexes));
        assert!(evaluate(
            &v,
            &Criterion::range(ident("age"), Some(Value::from(30i64)), Some(Value::from(40i64))),
            &regexes
        ));
        // Max bound is exclusive by default
        assert!(!evaluate(
            &v,
            &Criterion::range(ident("age"), Some(Value::from(20i64)), Some(Value::from(30i64))),
            &regexes
        ));
        // Range over a non-numeric value is false, not an error
        assert!(!evaluate(
            &v,
            &Criterion::range(ident("name"), Some(Value::from(0i64)), None),
            &regexes
        ));
    }

    #[test]
    fn should_evaluate_contains_by_variant() {
        let v = vertex_with(vec![
            ("bio", Value::from("Rust programmer")),
            ("langs", Value::List(vec![Value::from("en"), Value::from("fr")])),
        ]);
        let regexes = RegexCache::default();

        assert!(evaluate(
            &v,
            &Criterion::contains_substring(ident("bio"), "programmer", false),
            &regexes
        ));
        assert!(evaluate(
            &v,
            &Criterion::contains_substring(ident("bio"), "RUST", true),
            &regexes
        ));
        assert!(!evaluate(
            &v,
            &Criterion::contains_substring(ident("bio"), "RUST", false),
            &regexes
        ));
        assert!(evaluate(
            &v,
            &Criterion::contains_element(ident("langs"), "fr"),
            &regexes
        ));
        assert!(!evaluate(
            &v,
            &Criterion::contains_element(ident("langs"), "de"),
            &regexes
        ));
        // Substring criterion against a list value contributes false
        assert!(!evaluate(
            &v,
            &Criterion::contains_substring(ident("langs"), "en", false),
            &regexes
        ));
    }

    #[test]
    fn should_evaluate_composites_with_short_circuit() {
        let v = vertex_with(vec![("name", Value::from("alice"))]);
        let regexes = RegexCache::default();

        let yes = Criterion::exact(ident("name"), "alice");
        let no = Criterion::exact(ident("name"), "bob");

        assert!(evaluate(&v, &Criterion::and(vec![yes.clone(), yes.clone()]), &regexes));
        assert!(!evaluate(&v, &Criterion::and(vec![yes.clone(), no.clone()]), &regexes));
        assert!(evaluate(&v, &Criterion::or(vec![no.clone(), yes.clone()]), &regexes));
        assert!(evaluate(&v, &Criterion::not(no.clone()), &regexes));
        assert!(!evaluate(&v, &Criterion::not(yes), &regexes));

        // Malformed NOT arity evaluates to false instead of failing
        let malformed = Criterion::Composite {
            op: crate::query::CompositeOp::Not,
            children: vec![],
        };
        assert!(!evaluate(&v, &malformed, &regexes));
    }

    #[test]
    fn should_evaluate_regex_as_full_match() {
        let v = vertex_with(vec![("name", Value::from("alice"))]);
        let regexes = RegexCache::default();

        assert!(evaluate(&v, &Criterion::regex(ident("name"), "ali.*"), &regexes));
        assert!(!evaluate(&v, &Criterion::regex(ident("name"), "ali"), &regexes));
        assert!(!evaluate(&v, &Criterion::regex(ident("name"), "(bad"), &regexes));
    }

    #[test]
    fn should_aggregate_numeric_streams() {
        let values = vec![
            Value::from(10i64),
            Value::from(20i64),
            Value::from(10i64),
            Value::from("not a number"),
        ];
        let refs = || values.iter();

        assert_eq!(aggregate(refs(), AggregateOp::Count), Some(4.0));
        assert_eq!(aggregate(refs(), AggregateOp::DistinctCount), Some(3.0));
        assert_eq!(aggregate(refs(), AggregateOp::Min), Some(10.0));
        assert_eq!(aggregate(refs(), AggregateOp::Max), Some(20.0));
        assert_eq!(aggregate(refs(), AggregateOp::Sum), Some(40.0));
        assert_eq!(aggregate(refs(), AggregateOp::Average), Some(40.0 / 3.0));

        let empty: Vec<Value> = Vec::new();
        assert_eq!(aggregate(empty.iter(), AggregateOp::Min), None);
        assert_eq!(aggregate(empty.iter(), AggregateOp::Count), Some(0.0));
    }
}
