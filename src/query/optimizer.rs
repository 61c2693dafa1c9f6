use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::indices::IndexSet;
use crate::models::{Identifier, Value};
use crate::query::Criterion;
use crate::util::now_millis;

/// How many times a key pattern must be seen before the optimizer starts
/// recommending an index for it.
const RECOMMENDATION_THRESHOLD: u64 = 5;

/// The access path a plan starts from.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Exact tuple lookup against a composite index, with the equality
    /// criteria it covers.
    CompositeIndex {
        keys: Vec<Identifier>,
        criteria: Vec<Criterion>,
    },
    /// Interval scan against the range index.
    RangeIndex { key: Identifier, criterion: Criterion },
    /// Bucket lookup against the single-key index.
    KeyIndex { key: Identifier },
    /// Evaluate every criterion against every live element.
    FullScan { criteria: Vec<Criterion> },
}

/// The output of plan selection: a primary access path, the criteria left
/// to apply by scanning the candidates, and a cost in (0, 1] where 1 means
/// a full scan.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub primary: Strategy,
    pub secondary_filters: Vec<Criterion>,
    pub estimated_cost: f64,
}

/// Occurrence statistics for one distinct query key pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternStats {
    pub count: u64,
    pub last_seen_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    CreateComposite,
    CreateSingle,
}

/// A suggested index, derived from observed query patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecommendation {
    pub kind: RecommendationKind,
    pub keys: Vec<Identifier>,
    pub priority: u64,
}

impl fmt::Display for IndexRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self
            .keys
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        match self.kind {
            RecommendationKind::CreateComposite => {
                write!(f, "CREATE COMPOSITE INDEX ON ({}) -- seen {} times", keys, self.priority)
            }
            RecommendationKind::CreateSingle => {
                write!(f, "CREATE SINGLE INDEX ON {} -- seen {} times", keys, self.priority)
            }
        }
    }
}

/// Selects access paths for criterion lists and accumulates the statistics
/// (per-key selectivity, query key patterns) that future selections and
/// index recommendations draw on.
///
/// Selectivity memos go stale when an index is created, dropped or rebuilt;
/// the owning graph signals that through `invalidate_statistics`.
#[derive(Debug, Default)]
pub struct Optimizer {
    selectivity: HashMap<Identifier, f64>,
    patterns: HashMap<Vec<Identifier>, PatternStats>,
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks a plan for a criterion list. Strategies are considered in
    /// fixed order, first match wins:
    ///
    /// 1. two or more exact criteria covered by a composite index
    /// 2. the most selective indexed range criterion
    /// 3. the most selective single-indexed exact criterion
    /// 4. full scan
    pub(crate) fn plan(&mut self, criteria: &[Criterion], indices: &IndexSet) -> QueryPlan {
        self.record_pattern(criteria);

        let exacts: Vec<(&Identifier, &Value)> = criteria
            .iter()
            .filter_map(|c| match c {
                Criterion::Exact { key, value } => Some((key, value)),
                _ => None,
            })
            .collect();

        // 1. Composite index over the equality keys
        if exacts.len() >= 2 {
            let key_set: HashSet<Identifier> = exacts.iter().map(|(k, _)| (*k).clone()).collect();
            if let Some(list) = indices.composite.best_for_equality_set(&key_set) {
                return self.composite_plan(criteria, list);
            }
        }

        // 2. Cheapest indexed range criterion
        let mut best_range: Option<(usize, Identifier, f64)> = None;
        for (position, criterion) in criteria.iter().enumerate() {
            if let Criterion::Range { key, min, max, .. } = criterion {
                if indices.range.is_indexed(key) {
                    let selectivity = self.range_selectivity(key, min.as_ref(), max.as_ref(), indices);
                    if best_range.as_ref().map_or(true, |(_, _, best)| selectivity < *best) {
                        best_range = Some((position, key.clone(), selectivity));
                    }
                }
            }
        }
        if let Some((position, key, selectivity)) = best_range {
            let criterion = criteria[position].clone();
            let secondary_filters = without_position(criteria, position);
            return QueryPlan {
                primary: Strategy::RangeIndex { key, criterion },
                secondary_filters,
                estimated_cost: selectivity,
            };
        }

        // 3. Most selective single-indexed equality key
        let mut best_single: Option<(usize, Identifier, f64)> = None;
        for (position, criterion) in criteria.iter().enumerate() {
            if let Criterion::Exact { key, .. } = criterion {
                if indices.key.is_indexed(key) {
                    let selectivity = self.key_selectivity(key, indices);
                    if best_single.as_ref().map_or(true, |(_, _, best)| selectivity < *best) {
                        best_single = Some((position, key.clone(), selectivity));
                    }
                }
            }
        }
        if let Some((position, key, selectivity)) = best_single {
            let secondary_filters = without_position(criteria, position);
            return QueryPlan {
                primary: Strategy::KeyIndex { key },
                secondary_filters,
                estimated_cost: selectivity,
            };
        }

        // 4. Full scan
        QueryPlan {
            primary: Strategy::FullScan {
                criteria: criteria.to_vec(),
            },
            secondary_filters: Vec::new(),
            estimated_cost: 1.0,
        }
    }

    /// Clears the memoized selectivities. Called whenever an index is
    /// created, dropped or rebuilt so later plans reflect reality.
    pub fn invalidate_statistics(&mut self) {
        self.selectivity.clear();
    }

    /// The recorded query key patterns.
    pub fn patterns(&self) -> &HashMap<Vec<Identifier>, PatternStats> {
        &self.patterns
    }

    /// Index suggestions for patterns seen more than the threshold number
    /// of times, highest priority first.
    pub(crate) fn recommendations(&self, indices: &IndexSet) -> Vec<IndexRecommendation> {
        let mut out = Vec::new();
        for (keys, stats) in &self.patterns {
            if stats.count <= RECOMMENDATION_THRESHOLD {
                continue;
            }
            if keys.len() >= 2 {
                let key_set: HashSet<Identifier> = keys.iter().cloned().collect();
                if indices.composite.best_for_equality_set(&key_set).is_none() {
                    out.push(IndexRecommendation {
                        kind: RecommendationKind::CreateComposite,
                        keys: keys.clone(),
                        priority: stats.count,
                    });
                }
            } else if keys.len() == 1 && !indices.key.is_indexed(&keys[0]) {
                out.push(IndexRecommendation {
                    kind: RecommendationKind::CreateSingle,
                    keys: keys.clone(),
                    priority: stats.count,
                });
            }
        }
        out.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.keys.cmp(&b.keys)));
        out
    }

    fn composite_plan(&self, criteria: &[Criterion], list: Vec<Identifier>) -> QueryPlan {
        // One covering exact criterion per list key; everything else stays
        // as a secondary filter.
        let mut covered_positions = Vec::with_capacity(list.len());
        let mut matching = Vec::with_capacity(list.len());
        for key in &list {
            let found = criteria.iter().enumerate().find(|(position, c)| {
                !covered_positions.contains(position)
                    && matches!(c, Criterion::Exact { key: k, .. } if k == key)
            });
            if let Some((position, criterion)) = found {
                covered_positions.push(position);
                matching.push(criterion.clone());
            }
        }

        let secondary_filters = criteria
            .iter()
            .enumerate()
            .filter(|(position, _)| !covered_positions.contains(position))
            .map(|(_, c)| c.clone())
            .collect();

        let estimated_cost = (1.0 - 0.1 * matching.len() as f64).clamp(0.01, 1.0);
        QueryPlan {
            primary: Strategy::CompositeIndex { keys: list, criteria: matching },
            secondary_filters,
            estimated_cost,
        }
    }

    /// The estimated fraction of the store an equality lookup on `key`
    /// returns: the average bucket size over the element count, which
    /// reduces to one over the distinct value count.
    fn key_selectivity(&mut self, key: &Identifier, indices: &IndexSet) -> f64 {
        if let Some(known) = self.selectivity.get(key) {
            return *known;
        }
        let distinct = indices.key.distinct_values(key);
        let selectivity = (1.0 / std::cmp::max(1, distinct) as f64).clamp(0.01, 1.0);
        self.selectivity.insert(key.clone(), selectivity);
        selectivity
    }

    fn range_selectivity(
        &self,
        key: &Identifier,
        min: Option<&Value>,
        max: Option<&Value>,
        indices: &IndexSet,
    ) -> f64 {
        match (min.and_then(Value::as_f64), max.and_then(Value::as_f64)) {
            (Some(lo), Some(hi)) => {
                let bounds = (
                    indices.range.min_value(key).and_then(Value::as_f64),
                    indices.range.max_value(key).and_then(Value::as_f64),
                );
                if let (Some(key_min), Some(key_max)) = bounds {
                    let total = key_max - key_min;
                    if total > 0.0 {
                        ((hi - lo) / total).clamp(0.0, 1.0)
                    } else {
                        1.0
                    }
                } else {
                    1.0
                }
            }
            (None, None) => 1.0,
            _ => 0.5,
        }
    }

    fn record_pattern(&mut self, criteria: &[Criterion]) {
        let mut keys = Vec::new();
        for criterion in criteria {
            criterion.collect_keys(&mut keys);
        }
        keys.sort();
        keys.dedup();
        if keys.is_empty() {
            return;
        }
        let stats = self.patterns.entry(keys).or_insert(PatternStats {
            count: 0,
            last_seen_ms: 0,
        });
        stats.count += 1;
        stats.last_seen_ms = now_millis();
    }
}

fn without_position(criteria: &[Criterion], position: usize) -> Vec<Criterion> {
    criteria
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != position)
        .map(|(_, c)| c.clone())
        .collect()
}
