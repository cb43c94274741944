//! Performance Analytics
//!
//! Pure aggregation over completed quiz attempts: participation and
//! performance statistics, Bloom's-level accuracy, difficulty-band
//! distribution and learner proficiency. Every division is guarded; empty
//! input produces zeroed aggregates rather than NaN.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{BloomsBreakdown, BloomsLevel, BloomsProgress, BloomsTally};

/// Attempt lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
    TimedOut,
}

impl AttemptStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in-progress" => Some(AttemptStatus::InProgress),
            "completed" => Some(AttemptStatus::Completed),
            "abandoned" => Some(AttemptStatus::Abandoned),
            "timed-out" => Some(AttemptStatus::TimedOut),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in-progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Abandoned => "abandoned",
            AttemptStatus::TimedOut => "timed-out",
        }
    }

    /// Terminal states never transition back
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

/// Snapshot of one attempt, the canonical input of all aggregations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSnapshot {
    pub user_id: String,
    pub status: AttemptStatus,
    pub score: f64,
    pub is_passed: bool,
    pub total_time: f64,
    pub final_ability: f64,
    pub ability_change: f64,
    pub blooms: BloomsBreakdown,
    /// Stored difficulty of every individual response in the attempt
    pub response_difficulties: Vec<f64>,
}

/// Difficulty band of a single response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyBand {
    Easy,
    Medium,
    Hard,
}

/// Band classification: `< -0.5` easy, `> 0.5` hard, else medium.
pub fn classify_difficulty(difficulty: f64) -> DifficultyBand {
    if difficulty < -0.5 {
        DifficultyBand::Easy
    } else if difficulty > 0.5 {
        DifficultyBand::Hard
    } else {
        DifficultyBand::Medium
    }
}

/// Share of responses per difficulty band
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DifficultyDistribution {
    pub easy: f64,
    pub medium: f64,
    pub hard: f64,
}

/// Accuracy and volume at one Bloom's level across all attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloomsLevelStats {
    pub accuracy: f64,
    pub total_questions: u32,
}

/// Full quiz-level aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAggregate {
    pub total_attempts: usize,
    pub unique_students: usize,
    pub completion_rate: f64,
    pub average_score: f64,
    pub pass_rate: f64,
    pub average_time: f64,
    pub blooms: Vec<(BloomsLevel, BloomsLevelStats)>,
    pub difficulty: DifficultyDistribution,
}

impl QuizAggregate {
    /// Aggregate a set of attempt snapshots; empty input yields zeroes.
    pub fn from_attempts(attempts: &[AttemptSnapshot]) -> Self {
        if attempts.is_empty() {
            return Self {
                blooms: BloomsLevel::ALL
                    .iter()
                    .map(|&level| (level, BloomsLevelStats::default()))
                    .collect(),
                ..Self::default()
            };
        }

        let total = attempts.len() as f64;
        let unique_students = attempts
            .iter()
            .map(|a| a.user_id.as_str())
            .collect::<HashSet<_>>()
            .len();
        let completed = attempts
            .iter()
            .filter(|a| a.status == AttemptStatus::Completed)
            .count();
        let passed = attempts.iter().filter(|a| a.is_passed).count();

        Self {
            total_attempts: attempts.len(),
            unique_students,
            completion_rate: completed as f64 / total,
            average_score: attempts.iter().map(|a| a.score).sum::<f64>() / total,
            pass_rate: passed as f64 / total,
            average_time: attempts.iter().map(|a| a.total_time).sum::<f64>() / total,
            blooms: blooms_analysis(attempts),
            difficulty: difficulty_distribution(attempts),
        }
    }
}

/// Per-level accuracy across attempts: sum(correct) / sum(total), 0 on no data.
pub fn blooms_analysis(attempts: &[AttemptSnapshot]) -> Vec<(BloomsLevel, BloomsLevelStats)> {
    BloomsLevel::ALL
        .iter()
        .map(|&level| {
            let mut combined = BloomsTally::default();
            for attempt in attempts {
                let tally = attempt.blooms.get(level);
                combined.correct += tally.correct;
                combined.total += tally.total;
            }
            (
                level,
                BloomsLevelStats {
                    accuracy: combined.accuracy(),
                    total_questions: combined.total,
                },
            )
        })
        .collect()
}

/// Band share of every individual response across attempts.
pub fn difficulty_distribution(attempts: &[AttemptSnapshot]) -> DifficultyDistribution {
    let mut easy = 0usize;
    let mut medium = 0usize;
    let mut hard = 0usize;

    for attempt in attempts {
        for &difficulty in &attempt.response_difficulties {
            match classify_difficulty(difficulty) {
                DifficultyBand::Easy => easy += 1,
                DifficultyBand::Medium => medium += 1,
                DifficultyBand::Hard => hard += 1,
            }
        }
    }

    let total = easy + medium + hard;
    if total == 0 {
        return DifficultyDistribution::default();
    }

    let total = total as f64;
    DifficultyDistribution {
        easy: easy as f64 / total,
        medium: medium as f64 / total,
        hard: hard as f64 / total,
    }
}

/// Mean of the six Bloom's proficiency fractions.
pub fn overall_proficiency(progress: &BloomsProgress) -> f64 {
    let values = progress.values();
    values.iter().sum::<f64>() / values.len() as f64
}

/// Explicit running-average update: `(old * (n - 1) + sample) / n`.
///
/// `n` is the count *including* the new sample; n = 0 returns 0.
pub fn running_average(old_average: f64, n: u64, sample: f64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    (old_average * (n as f64 - 1.0) + sample) / n as f64
}

/// Descriptive performance band from accuracy and estimated ability.
pub fn performance_level(accuracy: f64, ability: f64) -> &'static str {
    if accuracy >= 0.9 && ability >= 2.0 {
        "excellent"
    } else if accuracy >= 0.8 && ability >= 1.0 {
        "good"
    } else if accuracy >= 0.7 && ability >= 0.0 {
        "satisfactory"
    } else if accuracy >= 0.6 && ability >= -1.0 {
        "needs_improvement"
    } else {
        "requires_support"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(user: &str, status: AttemptStatus, score: f64, passed: bool) -> AttemptSnapshot {
        AttemptSnapshot {
            user_id: user.to_string(),
            status,
            score,
            is_passed: passed,
            total_time: 120.0,
            final_ability: 0.0,
            ability_change: 0.0,
            blooms: BloomsBreakdown::default(),
            response_difficulties: Vec::new(),
        }
    }

    #[test]
    fn test_classify_difficulty_bands() {
        assert_eq!(classify_difficulty(-0.6), DifficultyBand::Easy);
        assert_eq!(classify_difficulty(-0.5), DifficultyBand::Medium);
        assert_eq!(classify_difficulty(0.0), DifficultyBand::Medium);
        assert_eq!(classify_difficulty(0.5), DifficultyBand::Medium);
        assert_eq!(classify_difficulty(0.6), DifficultyBand::Hard);
    }

    #[test]
    fn test_empty_aggregate_is_zeroed() {
        let aggregate = QuizAggregate::from_attempts(&[]);
        assert_eq!(aggregate.total_attempts, 0);
        assert_eq!(aggregate.average_score, 0.0);
        assert_eq!(aggregate.pass_rate, 0.0);
        assert_eq!(aggregate.blooms.len(), 6);
        assert!(aggregate.blooms.iter().all(|(_, s)| s.accuracy == 0.0));
    }

    #[test]
    fn test_participation_counts() {
        let attempts = vec![
            snapshot("alice", AttemptStatus::Completed, 80.0, true),
            snapshot("alice", AttemptStatus::Abandoned, 0.0, false),
            snapshot("bob", AttemptStatus::Completed, 60.0, false),
        ];
        let aggregate = QuizAggregate::from_attempts(&attempts);
        assert_eq!(aggregate.total_attempts, 3);
        assert_eq!(aggregate.unique_students, 2);
        assert!((aggregate.completion_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((aggregate.pass_rate - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_blooms_analysis_sums_across_attempts() {
        let mut first = snapshot("a", AttemptStatus::Completed, 100.0, true);
        first.blooms.record(BloomsLevel::Apply, true);
        first.blooms.record(BloomsLevel::Apply, true);
        let mut second = snapshot("b", AttemptStatus::Completed, 0.0, false);
        second.blooms.record(BloomsLevel::Apply, false);
        second.blooms.record(BloomsLevel::Apply, false);

        let analysis = blooms_analysis(&[first, second]);
        let (_, apply) = analysis
            .iter()
            .find(|(level, _)| *level == BloomsLevel::Apply)
            .unwrap();
        assert_eq!(apply.total_questions, 4);
        assert!((apply.accuracy - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_difficulty_distribution_shares() {
        let mut attempt = snapshot("a", AttemptStatus::Completed, 50.0, false);
        attempt.response_difficulties = vec![-0.6, 0.0, 0.6, 0.7];
        let distribution = difficulty_distribution(&[attempt]);
        assert!((distribution.easy - 0.25).abs() < 1e-9);
        assert!((distribution.medium - 0.25).abs() < 1e-9);
        assert!((distribution.hard - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_overall_proficiency_mean() {
        let mut progress = BloomsProgress::default();
        progress.set(BloomsLevel::Remember, 0.6);
        progress.set(BloomsLevel::Apply, 0.6);
        assert!((overall_proficiency(&progress) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_running_average() {
        // avg of [80] then [80, 60]
        let first = running_average(0.0, 1, 80.0);
        assert!((first - 80.0).abs() < 1e-9);
        let second = running_average(first, 2, 60.0);
        assert!((second - 70.0).abs() < 1e-9);
        assert_eq!(running_average(50.0, 0, 10.0), 0.0);
    }

    #[test]
    fn test_performance_level_bands() {
        assert_eq!(performance_level(0.95, 2.5), "excellent");
        assert_eq!(performance_level(0.85, 1.5), "good");
        assert_eq!(performance_level(0.75, 0.5), "satisfactory");
        assert_eq!(performance_level(0.65, -0.5), "needs_improvement");
        assert_eq!(performance_level(0.3, -2.0), "requires_support");
    }

    #[test]
    fn test_status_roundtrip_and_terminal() {
        for status in [
            AttemptStatus::InProgress,
            AttemptStatus::Completed,
            AttemptStatus::Abandoned,
            AttemptStatus::TimedOut,
        ] {
            assert_eq!(AttemptStatus::from_str(status.as_str()), Some(status));
        }
        assert!(!AttemptStatus::InProgress.is_terminal());
        assert!(AttemptStatus::Completed.is_terminal());
    }
}
