//! Common Types and Constants
//!
//! Shared data structures used across all algorithm modules.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Lower bound of the latent ability scale (theta)
pub const ABILITY_MIN: f64 = -4.0;

/// Upper bound of the latent ability scale (theta)
pub const ABILITY_MAX: f64 = 4.0;

/// Learning rate for the incremental ability update
pub const LEARNING_RATE: f64 = 0.1;

/// Maximum Newton iterations for batch ability estimation
pub const MLE_MAX_ITERATIONS: usize = 20;

/// Convergence tolerance on the score function for batch estimation
pub const MLE_TOLERANCE: f64 = 0.001;

/// Passing score threshold (percentage)
pub const PASS_THRESHOLD: f64 = 70.0;

/// Default discrimination (a parameter) when an item does not specify one
pub const DEFAULT_DISCRIMINATION: f64 = 1.0;

// ==================== Bloom's Taxonomy ====================

/// Bloom's taxonomy level, ordered by cognitive complexity (1-6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BloomsLevel {
    Remember,
    Understand,
    Apply,
    Analyze,
    Evaluate,
    Create,
}

impl BloomsLevel {
    /// All levels in ascending complexity order
    pub const ALL: [BloomsLevel; 6] = [
        BloomsLevel::Remember,
        BloomsLevel::Understand,
        BloomsLevel::Apply,
        BloomsLevel::Analyze,
        BloomsLevel::Evaluate,
        BloomsLevel::Create,
    ];

    /// Cognitive complexity rank, 1 = remember .. 6 = create
    pub fn complexity(&self) -> u8 {
        match self {
            BloomsLevel::Remember => 1,
            BloomsLevel::Understand => 2,
            BloomsLevel::Apply => 3,
            BloomsLevel::Analyze => 4,
            BloomsLevel::Evaluate => 5,
            BloomsLevel::Create => 6,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "remember" => Some(BloomsLevel::Remember),
            "understand" => Some(BloomsLevel::Understand),
            "apply" => Some(BloomsLevel::Apply),
            "analyze" => Some(BloomsLevel::Analyze),
            "evaluate" => Some(BloomsLevel::Evaluate),
            "create" => Some(BloomsLevel::Create),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BloomsLevel::Remember => "remember",
            BloomsLevel::Understand => "understand",
            BloomsLevel::Apply => "apply",
            BloomsLevel::Analyze => "analyze",
            BloomsLevel::Evaluate => "evaluate",
            BloomsLevel::Create => "create",
        }
    }
}

// ==================== IRT Item Parameters ====================

/// IRT item parameters: difficulty (b), discrimination (a), guessing (c)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemParams {
    /// b parameter, valid range [-4, 4]
    pub difficulty: f64,
    /// a parameter, valid range [0.1, 3]
    pub discrimination: f64,
    /// c parameter (lower asymptote), valid range [0, 1]
    pub guessing: f64,
}

impl Default for ItemParams {
    fn default() -> Self {
        Self {
            difficulty: 0.0,
            discrimination: DEFAULT_DISCRIMINATION,
            guessing: 0.0,
        }
    }
}

impl ItemParams {
    pub fn new(difficulty: f64) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Range check against the model's valid parameter space
    pub fn validate(&self) -> Result<(), String> {
        if !(ABILITY_MIN..=ABILITY_MAX).contains(&self.difficulty) {
            return Err(format!(
                "difficulty {} outside [{ABILITY_MIN}, {ABILITY_MAX}]",
                self.difficulty
            ));
        }
        if !(0.1..=3.0).contains(&self.discrimination) {
            return Err(format!(
                "discrimination {} outside [0.1, 3]",
                self.discrimination
            ));
        }
        if !(0.0..=1.0).contains(&self.guessing) {
            return Err(format!("guessing {} outside [0, 1]", self.guessing));
        }
        Ok(())
    }

    /// Copy with every parameter clamped into its valid range
    pub fn clamped(&self) -> Self {
        Self {
            difficulty: self.difficulty.clamp(ABILITY_MIN, ABILITY_MAX),
            discrimination: self.discrimination.clamp(0.1, 3.0),
            guessing: self.guessing.clamp(0.0, 1.0),
        }
    }
}

// ==================== Response Records ====================

/// Canonical record of a single scored response.
///
/// This is the only shape the estimation and analysis functions accept;
/// callers normalize stored or client-supplied payloads into it at the
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResponse {
    pub item: ItemParams,
    pub blooms_level: BloomsLevel,
    pub is_correct: bool,
    /// Response time in seconds; 0 when unknown
    pub response_time: f64,
}

impl ScoredResponse {
    pub fn new(item: ItemParams, blooms_level: BloomsLevel, is_correct: bool) -> Self {
        Self {
            item,
            blooms_level,
            is_correct,
            response_time: 0.0,
        }
    }
}

// ==================== Bloom's Tallies ====================

/// Correct/total counter for one Bloom's level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomsTally {
    pub correct: u32,
    pub total: u32,
}

impl BloomsTally {
    /// Accuracy fraction; 0 when no questions were attempted
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.correct) / f64::from(self.total)
        }
    }

    pub fn record(&mut self, is_correct: bool) {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
    }
}

/// Per-level tallies across all six Bloom's levels, fixed iteration order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomsBreakdown {
    pub remember: BloomsTally,
    pub understand: BloomsTally,
    pub apply: BloomsTally,
    pub analyze: BloomsTally,
    pub evaluate: BloomsTally,
    pub create: BloomsTally,
}

impl BloomsBreakdown {
    pub fn get(&self, level: BloomsLevel) -> BloomsTally {
        match level {
            BloomsLevel::Remember => self.remember,
            BloomsLevel::Understand => self.understand,
            BloomsLevel::Apply => self.apply,
            BloomsLevel::Analyze => self.analyze,
            BloomsLevel::Evaluate => self.evaluate,
            BloomsLevel::Create => self.create,
        }
    }

    pub fn get_mut(&mut self, level: BloomsLevel) -> &mut BloomsTally {
        match level {
            BloomsLevel::Remember => &mut self.remember,
            BloomsLevel::Understand => &mut self.understand,
            BloomsLevel::Apply => &mut self.apply,
            BloomsLevel::Analyze => &mut self.analyze,
            BloomsLevel::Evaluate => &mut self.evaluate,
            BloomsLevel::Create => &mut self.create,
        }
    }

    pub fn record(&mut self, level: BloomsLevel, is_correct: bool) {
        self.get_mut(level).record(is_correct);
    }

    /// (level, tally) pairs in complexity order
    pub fn iter(&self) -> impl Iterator<Item = (BloomsLevel, BloomsTally)> + '_ {
        BloomsLevel::ALL.iter().map(move |&level| (level, self.get(level)))
    }
}

/// Proficiency fraction per Bloom's level, each in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BloomsProgress {
    pub remember: f64,
    pub understand: f64,
    pub apply: f64,
    pub analyze: f64,
    pub evaluate: f64,
    pub create: f64,
}

impl BloomsProgress {
    pub fn get(&self, level: BloomsLevel) -> f64 {
        match level {
            BloomsLevel::Remember => self.remember,
            BloomsLevel::Understand => self.understand,
            BloomsLevel::Apply => self.apply,
            BloomsLevel::Analyze => self.analyze,
            BloomsLevel::Evaluate => self.evaluate,
            BloomsLevel::Create => self.create,
        }
    }

    pub fn set(&mut self, level: BloomsLevel, value: f64) {
        let value = value.clamp(0.0, 1.0);
        match level {
            BloomsLevel::Remember => self.remember = value,
            BloomsLevel::Understand => self.understand = value,
            BloomsLevel::Apply => self.apply = value,
            BloomsLevel::Analyze => self.analyze = value,
            BloomsLevel::Evaluate => self.evaluate = value,
            BloomsLevel::Create => self.create = value,
        }
    }

    /// Nudge one level after a response: +0.1 on correct, -0.05 on incorrect
    pub fn adjust(&mut self, level: BloomsLevel, is_correct: bool) {
        let current = self.get(level);
        let next = if is_correct {
            current + 0.1
        } else {
            current - 0.05
        };
        self.set(level, next);
    }

    pub fn values(&self) -> [f64; 6] {
        [
            self.remember,
            self.understand,
            self.apply,
            self.analyze,
            self.evaluate,
            self.create,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blooms_level_roundtrip() {
        for level in BloomsLevel::ALL {
            assert_eq!(BloomsLevel::from_str(level.as_str()), Some(level));
        }
        assert_eq!(BloomsLevel::from_str("Analyze"), Some(BloomsLevel::Analyze));
        assert_eq!(BloomsLevel::from_str("synthesize"), None);
    }

    #[test]
    fn test_complexity_ordering() {
        let ranks: Vec<u8> = BloomsLevel::ALL.iter().map(|l| l.complexity()).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_item_params_validate() {
        assert!(ItemParams::default().validate().is_ok());
        assert!(ItemParams::new(5.0).validate().is_err());
        let bad = ItemParams {
            discrimination: 0.0,
            ..ItemParams::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_item_params_clamped() {
        let clamped = ItemParams {
            difficulty: 9.0,
            discrimination: 10.0,
            guessing: -1.0,
        }
        .clamped();
        assert_eq!(clamped.difficulty, ABILITY_MAX);
        assert_eq!(clamped.discrimination, 3.0);
        assert_eq!(clamped.guessing, 0.0);
    }

    #[test]
    fn test_tally_accuracy_zero_total() {
        assert_eq!(BloomsTally::default().accuracy(), 0.0);
    }

    #[test]
    fn test_breakdown_record() {
        let mut breakdown = BloomsBreakdown::default();
        breakdown.record(BloomsLevel::Apply, true);
        breakdown.record(BloomsLevel::Apply, false);
        let tally = breakdown.get(BloomsLevel::Apply);
        assert_eq!(tally.correct, 1);
        assert_eq!(tally.total, 2);
        assert!((tally.accuracy() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_adjust_clamps() {
        let mut progress = BloomsProgress::default();
        for _ in 0..20 {
            progress.adjust(BloomsLevel::Create, true);
        }
        assert_eq!(progress.get(BloomsLevel::Create), 1.0);
        for _ in 0..40 {
            progress.adjust(BloomsLevel::Create, false);
        }
        assert_eq!(progress.get(BloomsLevel::Create), 0.0);
    }
}
