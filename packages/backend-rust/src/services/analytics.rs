//! Quiz-level analytics for quiz owners and admins.

use std::collections::HashMap;

use adaptiq_algo::analysis::{blooms_analysis, difficulty_distribution};
use adaptiq_algo::{
    performance_level, AttemptSnapshot, BloomsLevel, BloomsLevelStats, DifficultyDistribution,
    QuizAggregate,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthUser;
use crate::db::{attempts, quizzes, DatabaseProxy};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BloomsLevelReport {
    pub level: BloomsLevel,
    pub total_questions: u32,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgress {
    pub user_id: String,
    pub score: f64,
    pub is_passed: bool,
    pub ability_change: f64,
    pub performance_level: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnalytics {
    pub quiz_id: String,
    pub title: String,
    pub aggregate: QuizAggregate,
    pub blooms_breakdown: Vec<BloomsLevelReport>,
    pub difficulty_distribution: DifficultyDistribution,
    pub student_progress: Vec<StudentProgress>,
}

/// Aggregate analytics for one quiz. Only the quiz creator or an admin
/// may see them.
pub async fn quiz_analytics(
    proxy: &DatabaseProxy,
    user: &AuthUser,
    quiz_id: &str,
) -> Result<QuizAnalytics, AnalyticsError> {
    let quiz = quizzes::get_quiz(proxy, quiz_id)
        .await?
        .ok_or_else(|| AnalyticsError::NotFound(format!("quiz {quiz_id} not found")))?;

    if quiz.created_by != user.id && !user.is_admin() {
        return Err(AnalyticsError::Forbidden(
            "only the quiz creator can view analytics".to_string(),
        ));
    }

    let records = attempts::list_for_quiz(proxy, quiz_id).await?;

    let mut snapshots = Vec::with_capacity(records.len());
    for record in &records {
        let responses = attempts::list_responses(proxy, &record.id).await?;
        let difficulties = responses.iter().map(|r| r.difficulty).collect();
        snapshots.push(attempts::to_snapshot(record, difficulties));
    }

    let aggregate = QuizAggregate::from_attempts(&snapshots);
    let blooms_breakdown = blooms_analysis(&snapshots)
        .into_iter()
        .map(|(level, stats)| level_report(level, &stats))
        .collect();
    let distribution = difficulty_distribution(&snapshots);
    let student_progress = per_student_progress(&snapshots);

    Ok(QuizAnalytics {
        quiz_id: quiz.id,
        title: quiz.title,
        aggregate,
        blooms_breakdown,
        difficulty_distribution: distribution,
        student_progress,
    })
}

fn level_report(level: BloomsLevel, stats: &BloomsLevelStats) -> BloomsLevelReport {
    BloomsLevelReport {
        level,
        total_questions: stats.total_questions,
        accuracy: stats.accuracy,
    }
}

/// One row per student: their best completed attempt on this quiz.
fn per_student_progress(snapshots: &[AttemptSnapshot]) -> Vec<StudentProgress> {
    let mut best: HashMap<&str, &AttemptSnapshot> = HashMap::new();
    for snapshot in snapshots {
        if !snapshot.status.is_terminal() {
            continue;
        }
        let keep = best
            .get(snapshot.user_id.as_str())
            .is_some_and(|current| current.score >= snapshot.score);
        if !keep {
            best.insert(&snapshot.user_id, snapshot);
        }
    }

    let mut progress: Vec<StudentProgress> = best
        .into_values()
        .map(|snapshot| {
            let accuracy = snapshot.score / 100.0;
            StudentProgress {
                user_id: snapshot.user_id.clone(),
                score: snapshot.score,
                is_passed: snapshot.is_passed,
                ability_change: snapshot.ability_change,
                performance_level: performance_level(accuracy, snapshot.final_ability),
            }
        })
        .collect();
    progress.sort_by(|a, b| b.score.total_cmp(&a.score));
    progress
}
