pub(crate) mod criteria;
mod engine;
mod optimizer;

pub use criteria::{CompositeOp, Criterion};
pub use engine::AggregateOp;
pub use optimizer::{
    IndexRecommendation, Optimizer, PatternStats, QueryPlan, RecommendationKind, Strategy,
};
