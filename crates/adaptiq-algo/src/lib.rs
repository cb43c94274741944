//! # adaptiq-algo - Adaptive assessment core algorithms
//!
//! Pure-Rust implementations of the math behind adaptive quizzing:
//!
//! - **IRT ability estimation** - logistic response model, incremental
//!   (online) theta updates and batch maximum-likelihood estimation
//! - **Question selection** - Fisher-information scoring with Bloom's
//!   taxonomy weighting
//! - **Performance analytics** - Bloom's-level and difficulty-band
//!   aggregation over completed attempts
//! - **Feedback generation** - strengths / weaknesses / recommendations
//!   from per-level accuracy
//!
//! ## Design goals
//!
//! - **Pure Rust** - no I/O, no framework dependencies; usable from any
//!   service layer
//! - **Total functions** - every estimator and aggregation is defined for
//!   all well-formed numeric input; division-by-zero paths return zeroed
//!   results instead of failing
//! - **Deterministic** - identical input sequences always produce identical
//!   estimates
//!
//! ## Module structure
//!
//! - [`types`] - Bloom's taxonomy, IRT item parameters, canonical response
//!   records, shared constants
//! - [`estimator`] - ability estimation (incremental and batch MLE)
//! - [`selection`] - information-based question selection
//! - [`analysis`] - performance aggregation
//! - [`feedback`] - per-level feedback generation

pub mod analysis;
pub mod estimator;
pub mod feedback;
pub mod selection;
pub mod types;

pub use types::*;

pub use estimator::{
    estimate_ability, fisher_information, incremental_update, probability, probability_3pl,
    standard_error, AbilityUpdate,
};

pub use selection::{blooms_distribution, information_score, select_next, CandidateItem};

pub use analysis::{
    classify_difficulty, overall_proficiency, performance_level, running_average,
    AttemptSnapshot, AttemptStatus, BloomsLevelStats, DifficultyBand, DifficultyDistribution,
    QuizAggregate,
};

pub use feedback::{generate_feedback, Feedback};
