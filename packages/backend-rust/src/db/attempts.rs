use adaptiq_algo::{
    AttemptSnapshot, AttemptStatus, BloomsBreakdown, BloomsLevel, Feedback,
};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::db::{decode_json, encode_json, now_millis, DatabaseProxy};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub status: AttemptStatus,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub total_time: Option<f64>,
    pub score: Option<f64>,
    pub is_passed: Option<bool>,
    pub correct_answers: i64,
    pub total_questions: i64,
    pub initial_ability: f64,
    pub final_ability: f64,
    pub ability_change: f64,
    pub blooms_performance: BloomsBreakdown,
    pub feedback: Option<Feedback>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One row of the append-only response log
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecord {
    pub id: String,
    pub attempt_id: String,
    pub seq: i64,
    pub question_id: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub response_time: f64,
    pub difficulty: f64,
    pub blooms_level: BloomsLevel,
    pub expected_probability: f64,
    pub ability_estimate: f64,
    pub created_at: i64,
}

#[derive(Debug, Clone)]
pub struct NewResponse {
    pub question_id: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub response_time: f64,
    pub difficulty: f64,
    pub blooms_level: BloomsLevel,
    pub expected_probability: f64,
    pub ability_estimate: f64,
}

fn map_attempt_row(row: &SqliteRow) -> Result<AttemptRecord, sqlx::Error> {
    let status_raw: String = row.try_get("status")?;
    let status =
        AttemptStatus::from_str(&status_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: format!("unknown attempt status: {status_raw}").into(),
        })?;
    let blooms_raw: String = row.try_get("bloomsPerformance")?;
    let feedback_raw: Option<String> = row.try_get("feedback")?;
    let feedback = feedback_raw
        .as_deref()
        .map(|raw| decode_json("feedback", raw))
        .transpose()?;

    Ok(AttemptRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        quiz_id: row.try_get("quizId")?,
        status,
        start_time: row.try_get("startTime")?,
        end_time: row.try_get("endTime")?,
        total_time: row.try_get("totalTime")?,
        score: row.try_get("score")?,
        is_passed: row
            .try_get::<Option<i64>, _>("isPassed")?
            .map(|v| v != 0),
        correct_answers: row.try_get("correctAnswers")?,
        total_questions: row.try_get("totalQuestions")?,
        initial_ability: row.try_get("initialAbility")?,
        final_ability: row.try_get("finalAbility")?,
        ability_change: row.try_get("abilityChange")?,
        blooms_performance: decode_json("bloomsPerformance", &blooms_raw)?,
        feedback,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}

fn map_response_row(row: &SqliteRow) -> Result<ResponseRecord, sqlx::Error> {
    let level_raw: String = row.try_get("bloomsLevel")?;
    let blooms_level =
        BloomsLevel::from_str(&level_raw).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "bloomsLevel".to_string(),
            source: format!("unknown blooms level: {level_raw}").into(),
        })?;

    Ok(ResponseRecord {
        id: row.try_get("id")?,
        attempt_id: row.try_get("attemptId")?,
        seq: row.try_get("seq")?,
        question_id: row.try_get("questionId")?,
        user_answer: row.try_get("userAnswer")?,
        correct_answer: row.try_get("correctAnswer")?,
        is_correct: row.try_get::<i64, _>("isCorrect")? != 0,
        response_time: row.try_get("responseTime")?,
        difficulty: row.try_get("difficulty")?,
        blooms_level,
        expected_probability: row.try_get("expectedProbability")?,
        ability_estimate: row.try_get("abilityEstimate")?,
        created_at: row.try_get("createdAt")?,
    })
}

/// The single in-progress attempt for a (user, quiz) pair, if any.
pub async fn find_in_progress(
    proxy: &DatabaseProxy,
    user_id: &str,
    quiz_id: &str,
) -> Result<Option<AttemptRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT * FROM "quiz_attempts"
        WHERE "userId" = $1 AND "quizId" = $2 AND "status" = 'in-progress'
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .fetch_optional(proxy.pool())
    .await?;
    row.as_ref().map(map_attempt_row).transpose()
}

pub async fn create_attempt(
    conn: &mut SqliteConnection,
    user_id: &str,
    quiz_id: &str,
    initial_ability: f64,
) -> Result<AttemptRecord, sqlx::Error> {
    let now = now_millis();
    let id = Uuid::new_v4().to_string();
    let blooms = encode_json(&BloomsBreakdown::default())?;

    sqlx::query(
        r#"
        INSERT INTO "quiz_attempts"
          ("id","userId","quizId","status","startTime",
           "correctAnswers","totalQuestions","initialAbility","finalAbility","abilityChange",
           "bloomsPerformance","createdAt","updatedAt")
        VALUES ($1,$2,$3,'in-progress',$4,0,0,$5,$5,0,$6,$4,$4)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(quiz_id)
    .bind(now)
    .bind(initial_ability)
    .bind(blooms)
    .execute(conn)
    .await?;

    Ok(AttemptRecord {
        id,
        user_id: user_id.to_string(),
        quiz_id: quiz_id.to_string(),
        status: AttemptStatus::InProgress,
        start_time: now,
        end_time: None,
        total_time: None,
        score: None,
        is_passed: None,
        correct_answers: 0,
        total_questions: 0,
        initial_ability,
        final_ability: initial_ability,
        ability_change: 0.0,
        blooms_performance: BloomsBreakdown::default(),
        feedback: None,
        created_at: now,
        updated_at: now,
    })
}

/// Append a response row and fold its outcome into the attempt counters.
/// The response log is append-only; rows are never rewritten.
pub async fn append_response(
    conn: &mut SqliteConnection,
    attempt: &AttemptRecord,
    response: &NewResponse,
) -> Result<AttemptRecord, sqlx::Error> {
    let now = now_millis();
    let seq = attempt.total_questions;

    sqlx::query(
        r#"
        INSERT INTO "attempt_responses"
          ("id","attemptId","seq","questionId","userAnswer","correctAnswer","isCorrect",
           "responseTime","difficulty","bloomsLevel","expectedProbability","abilityEstimate",
           "createdAt")
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&attempt.id)
    .bind(seq)
    .bind(&response.question_id)
    .bind(&response.user_answer)
    .bind(&response.correct_answer)
    .bind(response.is_correct)
    .bind(response.response_time)
    .bind(response.difficulty)
    .bind(response.blooms_level.as_str())
    .bind(response.expected_probability)
    .bind(response.ability_estimate)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let mut updated = attempt.clone();
    updated.total_questions += 1;
    if response.is_correct {
        updated.correct_answers += 1;
    }
    updated
        .blooms_performance
        .record(response.blooms_level, response.is_correct);
    updated.final_ability = response.ability_estimate;
    updated.ability_change = updated.final_ability - updated.initial_ability;
    updated.updated_at = now;

    let blooms = encode_json(&updated.blooms_performance)?;
    sqlx::query(
        r#"
        UPDATE "quiz_attempts"
        SET "totalQuestions" = $2, "correctAnswers" = $3, "bloomsPerformance" = $4,
            "finalAbility" = $5, "abilityChange" = $6, "updatedAt" = $7
        WHERE "id" = $1
        "#,
    )
    .bind(&attempt.id)
    .bind(updated.total_questions)
    .bind(updated.correct_answers)
    .bind(blooms)
    .bind(updated.final_ability)
    .bind(updated.ability_change)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(updated)
}

/// Transition an in-progress attempt to `completed`. The WHERE clause on
/// status makes the terminal transition monotonic even under a racing call.
pub async fn finalize_attempt(
    conn: &mut SqliteConnection,
    attempt_id: &str,
    end_time: i64,
    total_time: f64,
    score: f64,
    is_passed: bool,
    feedback: &Feedback,
) -> Result<bool, sqlx::Error> {
    let feedback_json = encode_json(feedback)?;
    let result = sqlx::query(
        r#"
        UPDATE "quiz_attempts"
        SET "status" = 'completed', "endTime" = $2, "totalTime" = $3,
            "score" = $4, "isPassed" = $5, "feedback" = $6, "updatedAt" = $7
        WHERE "id" = $1 AND "status" = 'in-progress'
        "#,
    )
    .bind(attempt_id)
    .bind(end_time)
    .bind(total_time)
    .bind(score)
    .bind(is_passed)
    .bind(feedback_json)
    .bind(now_millis())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_responses(
    proxy: &DatabaseProxy,
    attempt_id: &str,
) -> Result<Vec<ResponseRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT * FROM "attempt_responses" WHERE "attemptId" = $1 ORDER BY "seq""#,
    )
    .bind(attempt_id)
    .fetch_all(proxy.pool())
    .await?;
    rows.iter().map(map_response_row).collect()
}

pub async fn list_for_quiz(
    proxy: &DatabaseProxy,
    quiz_id: &str,
) -> Result<Vec<AttemptRecord>, sqlx::Error> {
    let rows = sqlx::query(r#"SELECT * FROM "quiz_attempts" WHERE "quizId" = $1"#)
        .bind(quiz_id)
        .fetch_all(proxy.pool())
        .await?;
    rows.iter().map(map_attempt_row).collect()
}

pub async fn list_recent_for_user(
    proxy: &DatabaseProxy,
    user_id: &str,
    limit: i64,
) -> Result<Vec<AttemptRecord>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT * FROM "quiz_attempts" WHERE "userId" = $1 ORDER BY "createdAt" DESC LIMIT $2"#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(proxy.pool())
    .await?;
    rows.iter().map(map_attempt_row).collect()
}

/// View of an attempt in the shape the analytics aggregation accepts.
pub fn to_snapshot(attempt: &AttemptRecord, difficulties: Vec<f64>) -> AttemptSnapshot {
    AttemptSnapshot {
        user_id: attempt.user_id.clone(),
        status: attempt.status,
        score: attempt.score.unwrap_or(0.0),
        is_passed: attempt.is_passed.unwrap_or(false),
        total_time: attempt.total_time.unwrap_or(0.0),
        final_ability: attempt.final_ability,
        ability_change: attempt.ability_change,
        blooms: attempt.blooms_performance.clone(),
        response_difficulties: difficulties,
    }
}
