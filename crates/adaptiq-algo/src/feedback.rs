//! Feedback Generation
//!
//! Turns per-level Bloom's tallies into human-readable strengths,
//! weaknesses and practice recommendations.

use serde::{Deserialize, Serialize};

use crate::types::BloomsBreakdown;

const STRENGTH_THRESHOLD: f64 = 0.8;
const WEAKNESS_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Feedback from a Bloom's breakdown.
///
/// Levels with no attempted questions are skipped entirely: accuracy is
/// undefined there and they are reported neither as strength nor weakness.
pub fn generate_feedback(breakdown: &BloomsBreakdown) -> Feedback {
    let mut feedback = Feedback::default();

    for (level, tally) in breakdown.iter() {
        if tally.total == 0 {
            continue;
        }
        let accuracy = tally.accuracy();
        if accuracy >= STRENGTH_THRESHOLD {
            feedback
                .strengths
                .push(format!("Strong performance in {} level questions", level.as_str()));
        } else if accuracy < WEAKNESS_THRESHOLD {
            feedback
                .weaknesses
                .push(format!("Needs improvement in {} level questions", level.as_str()));
            feedback
                .recommendations
                .push(format!("Practice more {} level exercises", level.as_str()));
        }
    }

    feedback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BloomsLevel;

    #[test]
    fn test_untouched_levels_skipped() {
        let feedback = generate_feedback(&BloomsBreakdown::default());
        assert!(feedback.strengths.is_empty());
        assert!(feedback.weaknesses.is_empty());
        assert!(feedback.recommendations.is_empty());
    }

    #[test]
    fn test_strength_at_threshold() {
        let mut breakdown = BloomsBreakdown::default();
        for i in 0..5 {
            breakdown.record(BloomsLevel::Analyze, i < 4); // 4/5 = 0.8
        }
        let feedback = generate_feedback(&breakdown);
        assert_eq!(feedback.strengths.len(), 1);
        assert!(feedback.strengths[0].contains("analyze"));
        assert!(feedback.weaknesses.is_empty());
    }

    #[test]
    fn test_weakness_with_recommendation() {
        let mut breakdown = BloomsBreakdown::default();
        for i in 0..5 {
            breakdown.record(BloomsLevel::Create, i < 2); // 2/5 = 0.4
        }
        let feedback = generate_feedback(&breakdown);
        assert_eq!(feedback.weaknesses.len(), 1);
        assert_eq!(feedback.recommendations.len(), 1);
        assert!(feedback.recommendations[0].contains("create"));
    }

    #[test]
    fn test_middle_band_reports_nothing() {
        let mut breakdown = BloomsBreakdown::default();
        for i in 0..10 {
            breakdown.record(BloomsLevel::Apply, i < 6); // 0.6
        }
        let feedback = generate_feedback(&breakdown);
        assert!(feedback.strengths.is_empty());
        assert!(feedback.weaknesses.is_empty());
    }
}
