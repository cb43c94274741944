//! Adaptive quiz session orchestration.
//!
//! One session = one (user, quiz) pair with at most one in-progress
//! attempt. The upstream AI collaborator grades answers and generates
//! questions; ability estimation, response logging and attempt lifecycle
//! live here. Grading and analysis calls run before any mutation so both
//! `record_response` and `complete_quiz` stay all-or-nothing relative to
//! the attempt record.

use std::collections::HashMap;

use adaptiq_algo::{
    estimator, selection, AttemptStatus, BloomsLevel, CandidateItem, ItemParams, PASS_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::attempts::{self, AttemptRecord, NewResponse};
use crate::db::profiles::{self, SubjectPerformance};
use crate::db::quizzes::{
    self, AdaptiveSettings, NewQuestion, NewQuiz, QuestionRecord, TargetBloomsLevel,
};
use crate::db::{now_millis, DatabaseProxy};
use crate::services::ai_provider::{
    AiError, AiProvider, AnalysisReport, AnalyzeRequest, AnalyzedQuestion, AnalyzedResponse,
    GenerateQuizRequest, GradeRequest, RemainingQuestion, StudentProfileContext,
};

// Defaults for AI-generated 4-option multiple choice items
const GENERATED_DISCRIMINATION: f64 = 1.0;
const GENERATED_GUESSING: f64 = 0.25;
const ESTIMATED_SECONDS_PER_QUESTION: u32 = 120;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("upstream failure: {0}")]
    Upstream(#[from] AiError),
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}

// ==================== Inputs / outputs ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateQuizInput {
    pub subject: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default = "default_num_questions")]
    pub num_questions: u32,
    #[serde(default)]
    pub target_blooms_levels: Vec<BloomsLevel>,
}

fn default_difficulty() -> String {
    "medium".to_string()
}

fn default_num_questions() -> u32 {
    10
}

/// Question as exposed to the quiz taker; the correct answer stays server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: String,
    pub index: i64,
    pub text: String,
    pub question_type: String,
    pub options: Vec<String>,
    pub blooms_level: BloomsLevel,
    pub difficulty: f64,
    pub subject: String,
    pub topic: String,
    pub estimated_time: u32,
}

impl QuestionView {
    fn from_record(record: &QuestionRecord) -> Self {
        Self {
            id: record.id.clone(),
            index: record.index,
            text: record.question_text.clone(),
            question_type: record.question_type.clone(),
            options: record.options.clone(),
            blooms_level: record.blooms_level,
            difficulty: record.difficulty,
            subject: record.subject.clone(),
            topic: record.topic.clone(),
            estimated_time: ESTIMATED_SECONDS_PER_QUESTION,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuizOutput {
    pub quiz_id: String,
    pub title: String,
    pub subject: String,
    pub topic: String,
    pub is_adaptive: bool,
    pub total_questions: usize,
    pub estimated_time: u32,
    pub questions: Vec<QuestionView>,
    pub current_ability: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponseInput {
    pub quiz_id: String,
    pub question_id: String,
    pub answer: String,
    #[serde(default)]
    pub response_time: f64,
    #[serde(default = "default_true")]
    pub is_adaptive: bool,
    #[serde(default)]
    pub remaining_questions: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponseOutput {
    pub attempt_id: String,
    pub question_id: String,
    pub is_correct: bool,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub blooms_level: BloomsLevel,
    pub expected_probability: f64,
    pub updated_ability: f64,
    pub ability_change: f64,
    pub current_score: f64,
    pub next_question: Option<QuestionView>,
}

/// Client-supplied response used only as analyzer input; the stored log
/// stays canonical for persistence and feedback.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientResponse {
    pub question_id: String,
    pub difficulty: f64,
    pub blooms_level: BloomsLevel,
    pub is_correct: bool,
    #[serde(default)]
    pub response_time: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteQuizInput {
    pub quiz_id: String,
    #[serde(default)]
    pub responses: Option<Vec<ClientResponse>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub score: f64,
    pub total_questions: i64,
    pub correct_answers: i64,
    pub total_time: f64,
    pub is_passed: bool,
    pub ability_change: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteQuizOutput {
    pub attempt: AttemptRecord,
    pub analysis: AnalysisReport,
    pub summary: CompletionSummary,
}

// ==================== Operations ====================

/// Generate an adaptive quiz via the upstream AI service and persist it.
pub async fn generate_quiz(
    proxy: &DatabaseProxy,
    ai: &AiProvider,
    user_id: &str,
    input: GenerateQuizInput,
) -> Result<GeneratedQuizOutput, SessionError> {
    if input.subject.trim().is_empty() {
        return Err(SessionError::Validation("subject is required".to_string()));
    }
    if input.num_questions == 0 || input.num_questions > 50 {
        return Err(SessionError::Validation(
            "numQuestions must be between 1 and 50".to_string(),
        ));
    }

    let profile = profiles::get_or_create_profile(proxy, user_id).await?;

    let request = GenerateQuizRequest {
        user_id: user_id.to_string(),
        subject: input.subject.clone(),
        topic: input.topic.clone(),
        difficulty: input.difficulty.clone(),
        num_questions: input.num_questions,
        target_blooms_levels: input.target_blooms_levels.clone(),
        student_profile: StudentProfileContext {
            ability_level: profile.ability_level,
            blooms_progress: profile.blooms_levels,
            subject_abilities: subject_abilities(&profile.subject_performance),
        },
    };

    let generated = ai.generate_quiz(&request).await?;

    let new_quiz = NewQuiz {
        title: generated.title.clone(),
        description: format!("Adaptive quiz for {}", input.topic),
        subject: input.subject.clone(),
        topic: input.topic.clone(),
        created_by: user_id.to_string(),
        initial_difficulty: input.difficulty.clone(),
        target_blooms_levels: target_levels_with_weights(&input.target_blooms_levels),
        adaptive_settings: AdaptiveSettings {
            min_questions: input.num_questions.min(5),
            max_questions: input.num_questions,
            ..AdaptiveSettings::default()
        },
        questions: generated
            .questions
            .into_iter()
            .map(|q| NewQuestion {
                question_text: q.text,
                question_type: q
                    .question_type
                    .unwrap_or_else(|| "multiple-choice".to_string()),
                options: q.options,
                correct_answer: q.correct_answer.unwrap_or_default(),
                explanation: q.explanation.unwrap_or_default(),
                difficulty: q.difficulty.clamp(-4.0, 4.0),
                discrimination: GENERATED_DISCRIMINATION,
                guessing: GENERATED_GUESSING,
                blooms_level: q.blooms_level,
                keywords: vec![input.topic.clone()],
            })
            .collect(),
    };

    let quiz_id = quizzes::insert_quiz(proxy, &new_quiz).await?;
    let questions = quizzes::list_questions(proxy, &quiz_id).await?;

    tracing::info!(%quiz_id, user_id, count = questions.len(), "adaptive quiz generated");

    Ok(GeneratedQuizOutput {
        quiz_id,
        title: new_quiz.title,
        subject: new_quiz.subject,
        topic: new_quiz.topic,
        is_adaptive: true,
        total_questions: questions.len(),
        estimated_time: questions.len() as u32 * ESTIMATED_SECONDS_PER_QUESTION / 60,
        questions: questions.iter().map(QuestionView::from_record).collect(),
        current_ability: profile.ability_level,
    })
}

/// Grade one answer, update the ability estimate and append to the log.
pub async fn record_response(
    proxy: &DatabaseProxy,
    ai: &AiProvider,
    user_id: &str,
    input: RecordResponseInput,
) -> Result<RecordResponseOutput, SessionError> {
    let quiz = quizzes::get_quiz(proxy, &input.quiz_id)
        .await?
        .ok_or_else(|| SessionError::NotFound(format!("quiz {} not found", input.quiz_id)))?;
    let question = quizzes::get_question(proxy, &input.question_id)
        .await?
        .ok_or_else(|| {
            SessionError::NotFound(format!("question {} not found", input.question_id))
        })?;

    let mut profile = profiles::get_or_create_profile(proxy, user_id).await?;
    let existing = attempts::find_in_progress(proxy, user_id, &input.quiz_id).await?;

    let remaining = load_remaining(proxy, &input.remaining_questions).await?;

    // Grade before touching the attempt; an upstream failure leaves no trace.
    let graded = ai
        .grade_response(&GradeRequest {
            user_id: user_id.to_string(),
            quiz_id: input.quiz_id.clone(),
            question_id: input.question_id.clone(),
            answer: input.answer.clone(),
            response_time: input.response_time,
            is_adaptive: input.is_adaptive,
            remaining_questions: remaining
                .iter()
                .map(|q| RemainingQuestion {
                    id: q.id.clone(),
                    difficulty: q.difficulty,
                    discrimination: Some(q.discrimination),
                    guessing: Some(q.guessing),
                    blooms_level: q.blooms_level,
                })
                .collect(),
        })
        .await?;

    let item = question.item_params();
    let theta = existing
        .as_ref()
        .map(|a| a.final_ability)
        .unwrap_or(profile.ability_level);
    let update = estimator::incremental_update(theta, &item, graded.is_correct);

    let new_response = NewResponse {
        question_id: question.id.clone(),
        user_answer: input.answer.clone(),
        correct_answer: graded
            .correct_answer
            .clone()
            .unwrap_or_else(|| question.correct_answer.clone()),
        is_correct: graded.is_correct,
        response_time: input.response_time,
        difficulty: question.difficulty,
        blooms_level: question.blooms_level,
        expected_probability: update.expected_probability,
        ability_estimate: update.new_theta,
    };

    let mut tx = proxy.pool().begin().await?;

    let attempt = match existing {
        Some(attempt) => attempt,
        None => {
            attempts::create_attempt(&mut tx, user_id, &input.quiz_id, profile.ability_level)
                .await?
        }
    };
    let attempt = attempts::append_response(&mut tx, &attempt, &new_response).await?;

    quizzes::update_question_usage(
        &mut tx,
        &question.id,
        graded.is_correct,
        input.response_time,
    )
    .await?;

    profile.ability_level = update.new_theta;
    profile
        .blooms_levels
        .adjust(question.blooms_level, graded.is_correct);
    adjust_subject_performance(
        &mut profile.subject_performance,
        &quiz.subject,
        &item,
        question.blooms_level,
        graded.is_correct,
        update.new_theta,
    );
    profiles::save_ability(
        &mut tx,
        user_id,
        profile.ability_level,
        &profile.blooms_levels,
        &profile.subject_performance,
    )
    .await?;

    tx.commit().await?;

    let next_question =
        pick_next_question(proxy, &quiz, &input, &graded.next_question, update.new_theta, &remaining)
            .await?;

    Ok(RecordResponseOutput {
        attempt_id: attempt.id.clone(),
        question_id: question.id,
        is_correct: graded.is_correct,
        correct_answer: new_response.correct_answer,
        explanation: graded.explanation,
        blooms_level: question.blooms_level,
        expected_probability: update.expected_probability,
        updated_ability: update.new_theta,
        ability_change: attempt.ability_change,
        current_score: compute_score(attempt.correct_answers, attempt.total_questions),
        next_question,
    })
}

/// Finalize the in-progress attempt: analyze, score, feedback, aggregates.
pub async fn complete_quiz(
    proxy: &DatabaseProxy,
    ai: &AiProvider,
    user_id: &str,
    input: CompleteQuizInput,
) -> Result<CompleteQuizOutput, SessionError> {
    let attempt = attempts::find_in_progress(proxy, user_id, &input.quiz_id)
        .await?
        .ok_or_else(|| {
            SessionError::NotFound(format!(
                "no in-progress attempt for quiz {}",
                input.quiz_id
            ))
        })?;

    let stored = attempts::list_responses(proxy, &attempt.id).await?;

    let analyzer_responses: Vec<AnalyzedResponse> = match &input.responses {
        Some(client) => client
            .iter()
            .map(|r| AnalyzedResponse {
                question: AnalyzedQuestion {
                    id: r.question_id.clone(),
                    difficulty: r.difficulty,
                    blooms_level: r.blooms_level,
                },
                is_correct: r.is_correct,
                response_time: r.response_time,
            })
            .collect(),
        None => stored
            .iter()
            .map(|r| AnalyzedResponse {
                question: AnalyzedQuestion {
                    id: r.question_id.clone(),
                    difficulty: r.difficulty,
                    blooms_level: r.blooms_level,
                },
                is_correct: r.is_correct,
                response_time: r.response_time,
            })
            .collect(),
    };

    // Analysis first: an upstream failure must leave the attempt in progress.
    let analysis = ai
        .analyze_performance(&AnalyzeRequest {
            user_id: user_id.to_string(),
            responses: analyzer_responses,
        })
        .await?;

    let end_time = now_millis();
    let total_time = ((end_time - attempt.start_time) as f64 / 1000.0).max(0.0);
    let score = compute_score(attempt.correct_answers, attempt.total_questions);
    let is_passed = score >= PASS_THRESHOLD;
    let feedback = adaptiq_algo::generate_feedback(&attempt.blooms_performance);

    let mut tx = proxy.pool().begin().await?;

    let finalized = attempts::finalize_attempt(
        &mut tx,
        &attempt.id,
        end_time,
        total_time,
        score,
        is_passed,
        &feedback,
    )
    .await?;
    if !finalized {
        // Lost a race with another completion; the attempt is no longer ours.
        return Err(SessionError::NotFound(format!(
            "no in-progress attempt for quiz {}",
            input.quiz_id
        )));
    }

    quizzes::update_quiz_analytics(&mut tx, &input.quiz_id, score, total_time).await?;
    profiles::record_quiz_completion(&mut tx, user_id, score).await?;

    tx.commit().await?;

    let mut completed = attempt;
    completed.status = AttemptStatus::Completed;
    completed.end_time = Some(end_time);
    completed.total_time = Some(total_time);
    completed.score = Some(score);
    completed.is_passed = Some(is_passed);
    completed.feedback = Some(feedback);

    tracing::info!(
        attempt_id = %completed.id,
        score,
        is_passed,
        "quiz attempt completed"
    );

    Ok(CompleteQuizOutput {
        summary: CompletionSummary {
            score,
            total_questions: completed.total_questions,
            correct_answers: completed.correct_answers,
            total_time,
            is_passed,
            ability_change: completed.ability_change,
        },
        attempt: completed,
        analysis,
    })
}

// ==================== Helpers ====================

fn compute_score(correct: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    }
}

fn target_levels_with_weights(levels: &[BloomsLevel]) -> Vec<TargetBloomsLevel> {
    if levels.is_empty() {
        return Vec::new();
    }
    let weight = 1.0 / levels.len() as f64;
    levels
        .iter()
        .map(|&level| TargetBloomsLevel { level, weight })
        .collect()
}

fn subject_abilities(performance: &[SubjectPerformance]) -> HashMap<String, f64> {
    performance
        .iter()
        .map(|p| (p.subject.clone(), p.ability_level))
        .collect()
}

/// Keep the per-subject snapshot in step with the overall estimate.
fn adjust_subject_performance(
    performance: &mut Vec<SubjectPerformance>,
    subject: &str,
    item: &ItemParams,
    level: BloomsLevel,
    is_correct: bool,
    overall_ability: f64,
) {
    match performance.iter_mut().find(|p| p.subject == subject) {
        Some(entry) => {
            let update = estimator::incremental_update(entry.ability_level, item, is_correct);
            entry.ability_level = update.new_theta;
            entry.blooms_progress.adjust(level, is_correct);
            entry.last_updated = now_millis();
        }
        None => {
            let mut blooms = adaptiq_algo::BloomsProgress::default();
            blooms.adjust(level, is_correct);
            performance.push(SubjectPerformance {
                subject: subject.to_string(),
                ability_level: overall_ability,
                blooms_progress: blooms,
                last_updated: now_millis(),
            });
        }
    }
}

async fn load_remaining(
    proxy: &DatabaseProxy,
    ids: &[String],
) -> Result<Vec<QuestionRecord>, sqlx::Error> {
    let mut records = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(record) = quizzes::get_question(proxy, id).await? {
            records.push(record);
        }
    }
    Ok(records)
}

/// The grader may hand back the next item; otherwise pick the most
/// informative one locally from the client's remaining pool.
async fn pick_next_question(
    proxy: &DatabaseProxy,
    quiz: &quizzes::QuizRecord,
    input: &RecordResponseInput,
    upstream_next: &Option<serde_json::Value>,
    theta: f64,
    remaining: &[QuestionRecord],
) -> Result<Option<QuestionView>, SessionError> {
    if !input.is_adaptive {
        return Ok(None);
    }

    if let Some(value) = upstream_next {
        if let Some(id) = value.get("id").and_then(|v| v.as_str()) {
            if let Some(record) = quizzes::get_question(proxy, id).await? {
                return Ok(Some(QuestionView::from_record(&record)));
            }
        }
    }

    if remaining.is_empty() {
        return Ok(None);
    }

    let target_level = quiz
        .target_blooms_levels
        .iter()
        .max_by(|a, b| a.weight.total_cmp(&b.weight))
        .map(|t| t.level);

    let pool: Vec<CandidateItem> = remaining
        .iter()
        .map(|q| CandidateItem {
            id: q.id.clone(),
            item: q.item_params(),
            blooms_level: q.blooms_level,
        })
        .collect();

    let Some(selected) = selection::select_next(theta, &pool, target_level) else {
        return Ok(None);
    };
    tracing::debug!(
        question_id = %selected.id,
        expected = selection::expected_probability(theta, selected),
        "selected next question locally"
    );

    Ok(remaining
        .iter()
        .find(|q| q.id == selected.id)
        .map(QuestionView::from_record))
}
