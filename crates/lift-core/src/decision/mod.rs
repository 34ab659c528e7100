//! Decision layer: ROPE rules, bandit allocation, recommendations.

pub mod bandit;
pub mod recommend;
pub mod rope;

pub use bandit::{
    apply_floor, BanditError, ThompsonSampler, TopTwoThompsonSampler, DEFAULT_ALLOCATION_ROUNDS,
    DEFAULT_MIN_ALLOCATION, DEFAULT_TOP_TWO_BETA,
};
pub use recommend::{
    generate_recommendation, ConfidenceLevel, Decision, DecisionStatus, RecommendationInput,
};
pub use rope::{
    multi_variant_rope_decision, rope_decision, MultiRopeResult, PairwiseRope, RopeAnalysis,
    RopeError, RopeOutcome, RopeResult, ROPE_CREDIBLE_MASS,
};
