//! Question Selection
//!
//! Fisher-information scoring with Bloom's taxonomy weighting, used to pick
//! the most informative next item from a pool.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::estimator::{fisher_information, probability_3pl};
use crate::types::{BloomsLevel, ItemParams};

/// A selectable item: IRT parameters plus its Bloom's classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub id: String,
    pub item: ItemParams,
    pub blooms_level: BloomsLevel,
}

/// Information score of a candidate at the learner's current ability.
///
/// Target-level items are weighted x2, adjacent levels x1.5.
pub fn information_score(
    theta: f64,
    candidate: &CandidateItem,
    target_level: Option<BloomsLevel>,
) -> f64 {
    let information = fisher_information(theta, &candidate.item);

    let blooms_weight = match target_level {
        Some(target) if candidate.blooms_level == target => 2.0,
        Some(target)
            if candidate
                .blooms_level
                .complexity()
                .abs_diff(target.complexity())
                == 1 =>
        {
            1.5
        }
        _ => 1.0,
    };

    information * blooms_weight
}

/// Pick the highest-scoring candidate; None on an empty pool.
pub fn select_next<'a>(
    theta: f64,
    pool: &'a [CandidateItem],
    target_level: Option<BloomsLevel>,
) -> Option<&'a CandidateItem> {
    let mut best: Option<(&CandidateItem, f64)> = None;
    for candidate in pool {
        let score = information_score(theta, candidate, target_level);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Expected probability of a correct answer for a candidate, full 3PL.
pub fn expected_probability(theta: f64, candidate: &CandidateItem) -> f64 {
    probability_3pl(theta, &candidate.item)
}

/// Target Bloom's distribution for quiz assembly.
///
/// Explicit target levels share equal weight (1/count). An empty target list
/// falls back to the default distribution emphasizing higher-order thinking.
pub fn blooms_distribution(target_levels: &[BloomsLevel]) -> HashMap<BloomsLevel, f64> {
    if target_levels.is_empty() {
        return HashMap::from([
            (BloomsLevel::Remember, 0.1),
            (BloomsLevel::Understand, 0.2),
            (BloomsLevel::Apply, 0.3),
            (BloomsLevel::Analyze, 0.2),
            (BloomsLevel::Evaluate, 0.1),
            (BloomsLevel::Create, 0.1),
        ]);
    }

    let weight = 1.0 / target_levels.len() as f64;
    target_levels.iter().map(|&level| (level, weight)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, difficulty: f64, level: BloomsLevel) -> CandidateItem {
        CandidateItem {
            id: id.to_string(),
            item: ItemParams::new(difficulty),
            blooms_level: level,
        }
    }

    #[test]
    fn test_select_empty_pool() {
        assert!(select_next(0.0, &[], None).is_none());
    }

    #[test]
    fn test_select_prefers_matched_difficulty() {
        // Information peaks where P = 0.5, i.e. difficulty == theta
        let pool = vec![
            candidate("far", 3.0, BloomsLevel::Apply),
            candidate("near", 0.1, BloomsLevel::Apply),
            candidate("easy", -3.0, BloomsLevel::Apply),
        ];
        let selected = select_next(0.0, &pool, None).unwrap();
        assert_eq!(selected.id, "near");
    }

    #[test]
    fn test_target_level_weighting() {
        let matched = candidate("a", 0.5, BloomsLevel::Analyze);
        let other = candidate("b", 0.5, BloomsLevel::Remember);
        let target = Some(BloomsLevel::Analyze);
        assert!(
            information_score(0.0, &matched, target) > information_score(0.0, &other, target)
        );
    }

    #[test]
    fn test_adjacent_level_weighting() {
        let adjacent = candidate("a", 0.0, BloomsLevel::Evaluate);
        let distant = candidate("b", 0.0, BloomsLevel::Remember);
        let target = Some(BloomsLevel::Analyze);
        assert!(
            information_score(0.0, &adjacent, target) > information_score(0.0, &distant, target)
        );
    }

    #[test]
    fn test_expected_probability_guessing_floor() {
        let mut guessable = candidate("a", 0.0, BloomsLevel::Apply);
        guessable.item.guessing = 0.25;
        // Even a very weak learner stays above the guessing asymptote
        assert!(expected_probability(-4.0, &guessable) > 0.25);

        let unguessable = candidate("b", 0.0, BloomsLevel::Apply);
        assert!(expected_probability(-4.0, &unguessable) < 0.05);
    }

    #[test]
    fn test_blooms_distribution_equal_weights() {
        let dist = blooms_distribution(&[BloomsLevel::Apply, BloomsLevel::Analyze]);
        assert_eq!(dist.len(), 2);
        assert!((dist[&BloomsLevel::Apply] - 0.5).abs() < 1e-9);
        assert!((dist[&BloomsLevel::Analyze] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_blooms_distribution_default() {
        let dist = blooms_distribution(&[]);
        assert_eq!(dist.len(), 6);
        let total: f64 = dist.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!((dist[&BloomsLevel::Apply] - 0.3).abs() < 1e-9);
    }
}
