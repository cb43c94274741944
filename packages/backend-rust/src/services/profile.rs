//! Student profile view: ability snapshot plus recent attempt history.

use adaptiq_algo::{overall_proficiency, performance_level, AttemptStatus, BloomsProgress};
use serde::Serialize;
use thiserror::Error;

use crate::db::profiles::{StudentProfileRecord, SubjectPerformance};
use crate::db::{attempts, profiles, quizzes, DatabaseProxy};

const RECENT_ATTEMPT_LIMIT: i64 = 10;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAttempt {
    pub attempt_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub subject: String,
    pub status: AttemptStatus,
    pub score: Option<f64>,
    pub is_passed: Option<bool>,
    pub ability_change: f64,
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: String,
    pub ability_level: f64,
    pub overall_proficiency: f64,
    pub performance_level: &'static str,
    pub blooms_levels: BloomsProgress,
    pub subject_performance: Vec<SubjectPerformance>,
    pub total_quizzes_taken: i64,
    pub average_score: f64,
    pub recent_attempts: Vec<RecentAttempt>,
}

/// Build the profile view, creating a default profile on first access.
pub async fn get_profile_view(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<ProfileView, ProfileError> {
    let profile = profiles::get_or_create_profile(proxy, user_id).await?;

    let records = attempts::list_recent_for_user(proxy, user_id, RECENT_ATTEMPT_LIMIT).await?;
    let mut recent = Vec::with_capacity(records.len());
    for record in records {
        // Quizzes are never deleted, but tolerate a missing row anyway.
        let (quiz_title, subject) = match quizzes::get_quiz(proxy, &record.quiz_id).await? {
            Some(quiz) => (quiz.title, quiz.subject),
            None => (String::new(), String::new()),
        };
        recent.push(RecentAttempt {
            attempt_id: record.id,
            quiz_id: record.quiz_id,
            quiz_title,
            subject,
            status: record.status,
            score: record.score,
            is_passed: record.is_passed,
            ability_change: record.ability_change,
            completed_at: record.end_time,
        });
    }

    Ok(build_view(profile, recent))
}

fn build_view(profile: StudentProfileRecord, recent: Vec<RecentAttempt>) -> ProfileView {
    let proficiency = overall_proficiency(&profile.blooms_levels);
    let accuracy = profile.average_score / 100.0;
    ProfileView {
        user_id: profile.user_id,
        ability_level: profile.ability_level,
        overall_proficiency: proficiency,
        performance_level: performance_level(accuracy, profile.ability_level),
        blooms_levels: profile.blooms_levels,
        subject_performance: profile.subject_performance,
        total_quizzes_taken: profile.total_quizzes_taken,
        average_score: profile.average_score,
        recent_attempts: recent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::now_millis;

    fn profile(ability: f64, average_score: f64) -> StudentProfileRecord {
        let now = now_millis();
        StudentProfileRecord {
            user_id: "u1".to_string(),
            ability_level: ability,
            blooms_levels: BloomsProgress::default(),
            subject_performance: Vec::new(),
            total_quizzes_taken: 3,
            average_score,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_build_view_carries_profile_fields() {
        let view = build_view(profile(0.5, 82.0), Vec::new());
        assert_eq!(view.user_id, "u1");
        assert_eq!(view.ability_level, 0.5);
        assert_eq!(view.total_quizzes_taken, 3);
        assert!(view.recent_attempts.is_empty());
    }

    #[test]
    fn test_build_view_performance_level_uses_average_score() {
        let strong = build_view(profile(1.5, 95.0), Vec::new());
        let weak = build_view(profile(-2.0, 20.0), Vec::new());
        assert_ne!(strong.performance_level, weak.performance_level);
    }
}
