//! Ability Estimation
//!
//! IRT-based estimation of the latent ability parameter (theta). Two modes:
//! an incremental gradient update applied after every response during an
//! active session, and a batch Newton-style maximum-likelihood estimate
//! recomputed from a full response log.

use crate::types::{
    ItemParams, ScoredResponse, ABILITY_MAX, ABILITY_MIN, LEARNING_RATE, MLE_MAX_ITERATIONS,
    MLE_TOLERANCE,
};

/// Result of one incremental ability update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityUpdate {
    /// P(correct) at the pre-update theta
    pub expected_probability: f64,
    /// Theta after incorporating the response, clamped to [-4, 4]
    pub new_theta: f64,
}

/// Probability of a correct response under the 2PL logistic model.
///
/// `P = 1 / (1 + exp(-a * (theta - b)))`
///
/// The stored guessing parameter is intentionally not applied here; the
/// online update loop has always run on the guessing-less model and changing
/// it would shift every historical estimate. Use [`probability_3pl`] where
/// the lower asymptote matters.
pub fn probability(theta: f64, item: &ItemParams) -> f64 {
    let exponent = -item.discrimination * (theta - item.difficulty);
    1.0 / (1.0 + exponent.exp())
}

/// Probability of a correct response under the full 3PL model.
///
/// `P = c + (1 - c) / (1 + exp(-a * (theta - b)))`, with overflow guards.
pub fn probability_3pl(theta: f64, item: &ItemParams) -> f64 {
    let exponent = -item.discrimination * (theta - item.difficulty);
    if exponent > 700.0 {
        return item.guessing;
    }
    if exponent < -700.0 {
        return 1.0;
    }
    let p = item.guessing + (1.0 - item.guessing) / (1.0 + exponent.exp());
    p.clamp(0.0, 1.0)
}

/// Fisher information of an item at a given ability: `a^2 * P * (1 - P)`.
pub fn fisher_information(theta: f64, item: &ItemParams) -> f64 {
    let p = probability_3pl(theta, item);
    item.discrimination * item.discrimination * p * (1.0 - p)
}

/// Incremental (online) ability update after a single response.
///
/// Gradient step with fixed learning rate:
/// `theta' = theta + 0.1 * (observed - P(correct | theta))`,
/// result clamped to [-4, 4].
pub fn incremental_update(theta: f64, item: &ItemParams, is_correct: bool) -> AbilityUpdate {
    let expected = probability(theta, item);
    let observed = if is_correct { 1.0 } else { 0.0 };
    let new_theta = (theta + LEARNING_RATE * (observed - expected)).clamp(ABILITY_MIN, ABILITY_MAX);
    AbilityUpdate {
        expected_probability: expected,
        new_theta,
    }
}

/// Batch maximum-likelihood ability estimate over a full response log.
///
/// Difficulty-only model (discrimination fixed at 1). Newton iteration up to
/// 20 rounds, stopping early once the score function magnitude drops below
/// 0.001. A vanishing denominator (all probabilities saturated) yields no
/// further update for that iteration. Empty input returns exactly 0.
pub fn estimate_ability(responses: &[ScoredResponse]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }

    let mut theta = 0.0_f64;

    for _ in 0..MLE_MAX_ITERATIONS {
        let mut numerator = 0.0;
        let mut denominator = 0.0;

        for response in responses {
            let p = 1.0 / (1.0 + (-(theta - response.item.difficulty)).exp());
            let observed = if response.is_correct { 1.0 } else { 0.0 };
            numerator += observed - p;
            denominator += p * (1.0 - p);
        }

        if numerator.abs() < MLE_TOLERANCE {
            break;
        }
        if denominator <= f64::EPSILON {
            break;
        }
        theta += numerator / denominator;
    }

    theta.clamp(ABILITY_MIN, ABILITY_MAX)
}

/// Standard error of the ability estimate from the summed test information.
///
/// `SE = 1 / sqrt(max(sum_i I_i(theta), 0.1))`
pub fn standard_error(theta: f64, responses: &[ScoredResponse]) -> f64 {
    let information_sum: f64 = responses
        .iter()
        .map(|r| fisher_information(theta, &r.item))
        .sum();
    1.0 / information_sum.max(0.1).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BloomsLevel;
    use proptest::prelude::*;

    fn response(difficulty: f64, is_correct: bool) -> ScoredResponse {
        ScoredResponse::new(ItemParams::new(difficulty), BloomsLevel::Apply, is_correct)
    }

    #[test]
    fn test_probability_matched_ability() {
        let p = probability(0.0, &ItemParams::new(0.0));
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_probability_higher_ability() {
        let p = probability(2.0, &ItemParams::new(0.0));
        assert!(p > 0.8);
    }

    #[test]
    fn test_probability_3pl_floor() {
        let item = ItemParams {
            difficulty: 4.0,
            discrimination: 3.0,
            guessing: 0.25,
        };
        let p = probability_3pl(-4.0, &item);
        assert!(p >= 0.25);
    }

    #[test]
    fn test_incremental_update_correct_at_matched_difficulty() {
        // theta 0, difficulty 0, correct: 0 + 0.1 * (1 - 0.5) = 0.05
        let update = incremental_update(0.0, &ItemParams::new(0.0), true);
        assert!((update.expected_probability - 0.5).abs() < 1e-9);
        assert!((update.new_theta - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_incremental_update_direction() {
        let up = incremental_update(0.0, &ItemParams::new(0.0), true);
        assert!(up.new_theta > 0.0);
        let down = incremental_update(0.0, &ItemParams::new(0.0), false);
        assert!(down.new_theta < 0.0);
    }

    #[test]
    fn test_incremental_update_clamped() {
        let update = incremental_update(4.0, &ItemParams::new(-4.0), true);
        assert!(update.new_theta <= ABILITY_MAX);
        let update = incremental_update(-4.0, &ItemParams::new(4.0), false);
        assert!(update.new_theta >= ABILITY_MIN);
    }

    #[test]
    fn test_estimate_ability_empty() {
        assert_eq!(estimate_ability(&[]), 0.0);
    }

    #[test]
    fn test_estimate_ability_deterministic() {
        let responses: Vec<ScoredResponse> = (0..10)
            .map(|i| response(f64::from(i % 5) - 2.0, i % 3 != 0))
            .collect();
        let first = estimate_ability(&responses);
        let second = estimate_ability(&responses);
        assert_eq!(first, second);
    }

    #[test]
    fn test_estimate_ability_all_correct_is_high() {
        let responses: Vec<ScoredResponse> = (0..8).map(|_| response(1.0, true)).collect();
        let theta = estimate_ability(&responses);
        assert!(theta > 1.0);
        assert!(theta <= ABILITY_MAX);
    }

    #[test]
    fn test_estimate_ability_mixed_near_difficulty() {
        // 7/10 correct at difficulty 0 puts theta modestly above 0
        let responses: Vec<ScoredResponse> =
            (0..10).map(|i| response(0.0, i < 7)).collect();
        let theta = estimate_ability(&responses);
        assert!(theta > 0.0);
        assert!(theta < 2.0);
    }

    #[test]
    fn test_standard_error_shrinks_with_responses() {
        let few: Vec<ScoredResponse> = (0..2).map(|_| response(0.0, true)).collect();
        let many: Vec<ScoredResponse> = (0..20).map(|_| response(0.0, true)).collect();
        assert!(standard_error(0.0, &many) < standard_error(0.0, &few));
    }

    proptest! {
        #[test]
        fn prop_probability_strictly_bounded(
            theta in ABILITY_MIN..=ABILITY_MAX,
            difficulty in ABILITY_MIN..=ABILITY_MAX,
            discrimination in 0.1f64..=3.0,
        ) {
            let item = ItemParams { difficulty, discrimination, guessing: 0.0 };
            let p = probability(theta, &item);
            prop_assert!(p > 0.0);
            prop_assert!(p < 1.0);
        }

        #[test]
        fn prop_incremental_update_stays_in_range(
            theta in ABILITY_MIN..=ABILITY_MAX,
            difficulty in ABILITY_MIN..=ABILITY_MAX,
            is_correct: bool,
        ) {
            let update = incremental_update(theta, &ItemParams::new(difficulty), is_correct);
            prop_assert!(update.new_theta >= ABILITY_MIN);
            prop_assert!(update.new_theta <= ABILITY_MAX);
        }

        #[test]
        fn prop_estimate_stays_in_range(
            pattern in proptest::collection::vec((ABILITY_MIN..=ABILITY_MAX, any::<bool>()), 0..30)
        ) {
            let responses: Vec<ScoredResponse> = pattern
                .into_iter()
                .map(|(d, c)| response(d, c))
                .collect();
            let theta = estimate_ability(&responses);
            prop_assert!(theta >= ABILITY_MIN);
            prop_assert!(theta <= ABILITY_MAX);
        }
    }
}
